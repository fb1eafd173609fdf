use std::sync::Arc;

use axum::{
    extract::{Extension, State},
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

use crate::models::{SettingsError, UpdateClinicSettingsRequest};
use crate::services::settings::SettingsService;

/// Public clinic info for the booking and home pages.
#[axum::debug_handler]
pub async fn get_settings(
    State(config): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let service = SettingsService::new(&config);

    let settings = service
        .get_settings(None)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!(settings)))
}

#[axum::debug_handler]
pub async fn update_settings(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Extension(feed): Extension<Arc<ChangeFeed>>,
    Json(request): Json<UpdateClinicSettingsRequest>,
) -> Result<Json<Value>, AppError> {
    info!("Settings update by staff user {}", user.id);

    let service = SettingsService::new(&config);

    let settings = service
        .update_settings(request, auth.token())
        .await
        .map_err(|e| match e {
            SettingsError::ValidationError(msg) => AppError::ValidationError(msg),
            SettingsError::DatabaseError(msg) => AppError::Database(msg),
        })?;

    feed.publish(ChangeEvent::new("clinic_settings", ChangeKind::Update));

    Ok(Json(json!(settings)))
}
