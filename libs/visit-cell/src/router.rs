use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

/// Patient-facing routes: booking and tracking, no authentication.
pub fn create_visit_router(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", post(book_visit))
        .route("/uid/{uid}", get(get_visit_by_uid))
        .with_state(config)
}

/// Staff routes, gated by the auth middleware.
pub fn create_admin_visit_router(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(search_visits))
        .route("/checkin", post(checkin_scan))
        .route("/{id}", get(get_visit))
        .route("/{id}", patch(update_visit))
        .route("/{id}", delete(delete_visit))
        .route("/{id}/status", post(update_status))
        .route("/{id}/payment/paid", post(mark_paid))
        .route("/{id}/payment/refund", post(refund))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
