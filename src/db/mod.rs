use std::future::Future;
use std::time::Duration;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};

use crate::config::Config;
use crate::error::{AppError, AppResult};

pub async fn connect(config: &Config) -> AppResult<DatabaseConnection> {
    let mut options = ConnectOptions::new(config.database_url.clone());
    options
        .max_connections(config.db_max_connections)
        .connect_timeout(config.query_timeout())
        .acquire_timeout(config.query_timeout())
        .sqlx_logging(false);

    Database::connect(options)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to connect to database: {}", e)))
}

/// Run a store operation under a deadline.
///
/// Expiry surfaces as [`AppError::TransientStore`]. Store failures are logged
/// with the operation name only, never the payload.
pub async fn with_timeout<F, T>(operation: &'static str, limit: Duration, fut: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    let result = match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(AppError::TransientStore(format!(
            "{} timed out after {:?}",
            operation, limit
        ))),
    };

    if let Err(e) = &result {
        if e.is_store_failure() {
            tracing::error!(operation, error = %e, "store operation failed");
        }
    }

    result
}

/// Cheap round trip used by the health check.
pub async fn ping(db: &DatabaseConnection, limit: Duration) -> AppResult<()> {
    with_timeout("ping", limit, async {
        db.execute_unprepared("SELECT 1").await?;
        Ok(())
    })
    .await
}
