use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::entities::service;
use crate::error::AppResult;
use crate::handlers::ApiResponse;
use crate::services::catalog;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ServiceQuery {
    pub category: Option<String>,
}

/// List active services, optionally for one category
pub async fn list_services(
    State(state): State<AppState>,
    Query(query): Query<ServiceQuery>,
) -> AppResult<Json<ApiResponse<Vec<service::Model>>>> {
    let services = catalog::list_services(
        &state.db,
        state.config.query_timeout(),
        query.category.as_deref(),
    )
    .await?;

    Ok(Json(ApiResponse::success("Services retrieved", services)))
}

pub async fn get_service(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<service::Model>>> {
    let service = catalog::find_active_service(&state.db, state.config.query_timeout(), id).await?;
    Ok(Json(ApiResponse::success("Service found", service)))
}
