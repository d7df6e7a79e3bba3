use axum::{extract::State, Json};
use chrono::Utc;
use serde_json::{json, Value};

use crate::db;
use crate::error::AppResult;
use crate::AppState;

/// Liveness plus a store round trip
pub async fn health(State(state): State<AppState>) -> AppResult<Json<Value>> {
    db::ping(&state.db, state.config.query_timeout()).await?;

    Ok(Json(json!({
        "success": true,
        "status": "ok",
        "database": "connected",
        "timestamp": Utc::now(),
    })))
}
