use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::{create_prescription, get_prescription_by_visit_uid};

pub fn create_prescription_router(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/visit/{uid}", get(get_prescription_by_visit_uid))
        .with_state(config)
}

pub fn create_admin_prescription_router(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", post(create_prescription))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
