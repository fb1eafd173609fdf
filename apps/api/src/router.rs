use std::sync::Arc;

use axum::{routing::get, Extension, Router};

use prescription_cell::router::{create_admin_prescription_router, create_prescription_router};
use queue_summary_cell::router::create_queue_router;
use realtime_cell::router::create_realtime_router;
use realtime_cell::ChangeFeed;
use settings_cell::router::{create_admin_settings_router, create_settings_router};
use shared_config::AppConfig;
use visit_cell::router::{create_admin_visit_router, create_visit_router};

pub fn create_router(state: Arc<AppConfig>) -> Router {
    // One change feed for the whole process; every cell publishes into it
    let feed = Arc::new(ChangeFeed::new());

    Router::new()
        .route("/", get(|| async { "XCare front-desk API is running!" }))
        // Patient-facing surface
        .nest("/visits", create_visit_router(state.clone()))
        .nest("/queue", create_queue_router(state.clone()))
        .nest("/settings", create_settings_router(state.clone()))
        .nest("/prescriptions", create_prescription_router(state.clone()))
        .nest("/realtime", create_realtime_router())
        // Staff surface
        .nest("/admin/visits", create_admin_visit_router(state.clone()))
        .nest("/admin/settings", create_admin_settings_router(state.clone()))
        .nest(
            "/admin/prescriptions",
            create_admin_prescription_router(state),
        )
        .layer(Extension(feed))
}
