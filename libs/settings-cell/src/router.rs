use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::{get_settings, update_settings};

pub fn create_settings_router(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(get_settings))
        .with_state(config)
}

pub fn create_admin_settings_router(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", put(update_settings))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
