use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::info;

use realtime_cell::{ChangeEvent, ChangeFeed, ChangeKind};
use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::CreatePrescriptionRequest;
use crate::services::prescription::PrescriptionService;

#[axum::debug_handler]
pub async fn create_prescription(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Extension(feed): Extension<Arc<ChangeFeed>>,
    Json(request): Json<CreatePrescriptionRequest>,
) -> Result<Json<Value>, AppError> {
    info!(
        "Prescription for visit {} issued by staff {}",
        request.visit_id, user.id
    );

    let service = PrescriptionService::new(&config);

    let prescription = service
        .create_prescription(request, auth.token())
        .await
        .map_err(AppError::from)?;

    feed.publish(
        ChangeEvent::new("prescriptions", ChangeKind::Insert)
            .with_record_id(prescription.id.to_string()),
    );

    Ok(Json(json!(prescription)))
}

/// Patient download lookup by booking uid.
#[axum::debug_handler]
pub async fn get_prescription_by_visit_uid(
    State(config): State<Arc<AppConfig>>,
    Path(uid): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = PrescriptionService::new(&config);

    let prescription = service
        .get_by_visit_uid(&uid)
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!(prescription)))
}
