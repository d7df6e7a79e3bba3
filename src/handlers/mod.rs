pub mod admin;
pub mod auth;
pub mod bookings;
pub mod health;
pub mod services;

use serde::Serialize;

/// Success envelope; errors use `{"success": false, "error": ...}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(message: &str, data: T) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            data,
        }
    }
}
