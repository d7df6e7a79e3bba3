use axum::{
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};

use crate::handlers::{admin, auth, bookings, health, services};
use crate::middleware::auth::{auth_middleware, require_admin, require_customer};
use crate::AppState;

/// Application routes. Rate limiting, CORS and tracing are layered on in
/// `main` since they depend on the serving setup.
pub fn create_router(state: AppState) -> Router {
    // Public auth routes
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/verify-phone", post(auth::verify_phone))
        .route("/login", post(auth::login))
        .route("/resend-code", post(auth::resend_code));

    // Customer routes (requires auth + customer role)
    let customer_routes = Router::new()
        .route("/", post(bookings::create_booking))
        .route("/my-bookings", get(bookings::my_bookings))
        .route_layer(middleware::from_fn(require_customer))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Reachable by code; ownership is checked in the handlers
    let code_routes = Router::new()
        .route("/guest", post(bookings::create_guest_booking))
        .route(
            "/{code}",
            get(bookings::get_booking).put(bookings::update_booking),
        )
        .route("/{code}/cancel", patch(bookings::cancel_booking));

    // Admin routes (requires auth + admin role)
    let admin_routes = Router::new()
        .route("/bookings", get(admin::list_bookings))
        .route("/bookings/{code}", delete(admin::delete_booking))
        .route("/bookings/{code}/status", put(admin::update_status))
        .route("/services", get(admin::list_services))
        .route("/stats", get(admin::stats))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/api/health", get(health::health))
        .route("/api/services", get(services::list_services))
        .route("/api/services/{id}", get(services::get_service))
        .route("/api/admin/login", post(admin::login))
        .nest("/api/auth", auth_routes)
        .nest("/api/bookings", customer_routes.merge(code_routes))
        .nest("/api/admin", admin_routes)
        .with_state(state)
}
