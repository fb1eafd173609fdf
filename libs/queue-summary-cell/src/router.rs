use std::sync::Arc;

use axum::{routing::get, Router};

use shared_config::AppConfig;

use crate::handlers::{get_queue_by_date, get_today_queue};

pub fn create_queue_router(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/today", get(get_today_queue))
        .route("/{date}", get(get_queue_by_date))
        .with_state(config)
}
