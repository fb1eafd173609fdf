use axum::{routing::get, Router};

use crate::handlers::realtime_ws;

pub fn create_realtime_router() -> Router {
    Router::new().route("/ws", get(realtime_ws))
}
