use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{DbErr, RuntimeErr, SqlErr};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("Please verify your phone number before logging in")]
    Unverified,

    #[error("Invalid phone number or password")]
    InvalidCredentials,

    #[error("{0}")]
    Unauthorized(String),

    /// Connectivity or timeout failure; safe to retry
    #[error("Service temporarily unavailable: {0}")]
    TransientStore(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InvalidState(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unverified => StatusCode::FORBIDDEN,
            AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::TransientStore(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Store-level failures, as opposed to business-rule rejections.
    pub fn is_store_failure(&self) -> bool {
        matches!(self, AppError::TransientStore(_) | AppError::Internal(_))
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        if let Some(SqlErr::UniqueConstraintViolation(_)) = err.sql_err() {
            return AppError::Conflict("Record already exists".to_string());
        }

        if is_contention_failure(&err) {
            return AppError::TransientStore("Concurrent update, please retry".to_string());
        }

        match err {
            DbErr::ConnectionAcquire(e) => AppError::TransientStore(e.to_string()),
            DbErr::Conn(e) => AppError::TransientStore(e.to_string()),
            DbErr::RecordNotFound(what) => AppError::NotFound(what),
            other => AppError::Internal(other.to_string()),
        }
    }
}

/// Lost races for a lock or a serializable snapshot: Postgres 40001 and
/// 40P01, SQLite BUSY (5), BUSY_SNAPSHOT (517) and LOCKED (6).
fn is_contention_failure(err: &DbErr) -> bool {
    let runtime = match err {
        DbErr::Exec(e) | DbErr::Query(e) => e,
        _ => return false,
    };

    match runtime {
        RuntimeErr::SqlxError(sea_orm::sqlx::Error::Database(db_err)) => matches!(
            db_err.code().as_deref(),
            Some("40001") | Some("40P01") | Some("5") | Some("517") | Some("6")
        ),
        _ => false,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match &self {
            AppError::Internal(detail) => {
                tracing::error!(error = %detail, "unexpected error");
                "Internal server error".to_string()
            }
            AppError::TransientStore(detail) => {
                tracing::warn!(error = %detail, "store unavailable");
                "Service temporarily unavailable".to_string()
            }
            other => other.to_string(),
        };

        let body = serde_json::json!({ "success": false, "error": message });
        (status, Json(body)).into_response()
    }
}
