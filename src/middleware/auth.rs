use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
    RequestPartsExt,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::error::{AppError, AppResult};
use crate::utils::jwt::{verify_token, Claims, Role};
use crate::AppState;

/// Claims from the bearer token, if one was sent.
///
/// An absent header is fine; a present but invalid one is rejected.
async fn bearer_claims(parts: &mut Parts, secret: &str) -> AppResult<Option<Claims>> {
    if !parts.headers.contains_key(AUTHORIZATION) {
        return Ok(None);
    }

    let TypedHeader(auth) = parts
        .extract::<TypedHeader<Authorization<Bearer>>>()
        .await
        .map_err(|_| AppError::Unauthorized("Malformed authorization header".to_string()))?;

    verify_token(auth.token(), secret).map(Some)
}

/// Extract and validate JWT token from Authorization header
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> AppResult<Response> {
    let (mut parts, body) = request.into_parts();

    let claims = bearer_claims(&mut parts, &state.config.jwt_secret)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Missing authorization token".to_string()))?;

    let mut request = Request::from_parts(parts, body);
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

fn require_role(request: &Request, role: Role, denied: &str) -> AppResult<()> {
    let claims = request
        .extensions()
        .get::<Claims>()
        .ok_or_else(|| AppError::Unauthorized("No authentication found".to_string()))?;

    if claims.role != role {
        return Err(AppError::Forbidden(denied.to_string()));
    }

    Ok(())
}

/// Require admin role
pub async fn require_admin(request: Request, next: Next) -> AppResult<Response> {
    require_role(&request, Role::Admin, "Admin access required")?;
    Ok(next.run(request).await)
}

/// Require a customer account
pub async fn require_customer(request: Request, next: Next) -> AppResult<Response> {
    require_role(&request, Role::Customer, "Customer account required")?;
    Ok(next.run(request).await)
}

/// Optional authentication for routes that guests can also reach by
/// booking code.
#[derive(Debug, Clone)]
pub struct MaybeClaims(pub Option<Claims>);

impl FromRequestParts<AppState> for MaybeClaims {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        bearer_claims(parts, &state.config.jwt_secret).await.map(MaybeClaims)
    }
}
