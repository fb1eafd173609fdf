use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use queue_summary_cell::services::aggregator::QueueSummaryAggregator;
use realtime_cell::ChangeFeed;
use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    BookVisitRequest, BookVisitResponse, CheckinScanRequest, StatusUpdateRequest,
    UpdateVisitRequest, Visit, VisitSearchQuery,
};
use crate::services::visits::VisitService;

/// Public booking endpoint: no account, no token. Returns the stored
/// visit plus the QR payload for the confirmation screen.
#[axum::debug_handler]
pub async fn book_visit(
    State(config): State<Arc<AppConfig>>,
    Extension(feed): Extension<Arc<ChangeFeed>>,
    Json(request): Json<BookVisitRequest>,
) -> Result<Json<Value>, AppError> {
    let service = VisitService::new(&config);

    let visit = service.book_visit(request).await.map_err(AppError::from)?;
    let qr_payload = service.qr_payload(&visit).map_err(AppError::from)?;

    after_visit_mutation(&config, &feed, &visit, MutationKind::Insert);

    Ok(Json(json!(BookVisitResponse { visit, qr_payload })))
}

/// Public tracking lookup by booking uid.
#[axum::debug_handler]
pub async fn get_visit_by_uid(
    State(config): State<Arc<AppConfig>>,
    Path(uid): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = VisitService::new(&config);

    let visit = service
        .get_visit_by_uid(&uid, None)
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!(visit)))
}

#[axum::debug_handler]
pub async fn search_visits(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Query(query): Query<VisitSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let service = VisitService::new(&config);

    let visits = service
        .search_visits(query, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!({
        "visits": visits,
        "total": visits.len()
    })))
}

#[axum::debug_handler]
pub async fn get_visit(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Path(visit_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = VisitService::new(&config);

    let visit = service
        .get_visit(visit_id, Some(auth.token()))
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!(visit)))
}

#[axum::debug_handler]
pub async fn update_visit(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Extension(feed): Extension<Arc<ChangeFeed>>,
    Path(visit_id): Path<Uuid>,
    Json(request): Json<UpdateVisitRequest>,
) -> Result<Json<Value>, AppError> {
    let service = VisitService::new(&config);

    let visit = service
        .update_visit(visit_id, request, auth.token())
        .await
        .map_err(AppError::from)?;

    after_visit_mutation(&config, &feed, &visit, MutationKind::Update);

    Ok(Json(json!(visit)))
}

#[axum::debug_handler]
pub async fn update_status(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Extension(feed): Extension<Arc<ChangeFeed>>,
    Path(visit_id): Path<Uuid>,
    Json(request): Json<StatusUpdateRequest>,
) -> Result<Json<Value>, AppError> {
    info!(
        "Status update to {} for visit {} by staff {}",
        request.new_status, visit_id, user.id
    );

    let service = VisitService::new(&config);

    let visit = service
        .apply_status(visit_id, request, auth.token())
        .await
        .map_err(AppError::from)?;

    after_visit_mutation(&config, &feed, &visit, MutationKind::Update);

    Ok(Json(json!(visit)))
}

/// Front-desk QR scan: resolves the payload and checks the patient in.
#[axum::debug_handler]
pub async fn checkin_scan(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Extension(feed): Extension<Arc<ChangeFeed>>,
    Json(request): Json<CheckinScanRequest>,
) -> Result<Json<Value>, AppError> {
    let service = VisitService::new(&config);

    let visit = service
        .check_in_scan(&request.payload, auth.token())
        .await
        .map_err(AppError::from)?;

    after_visit_mutation(&config, &feed, &visit, MutationKind::Update);

    Ok(Json(json!(visit)))
}

#[axum::debug_handler]
pub async fn mark_paid(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Extension(feed): Extension<Arc<ChangeFeed>>,
    Path(visit_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = VisitService::new(&config);

    let visit = service
        .mark_paid(visit_id, auth.token())
        .await
        .map_err(AppError::from)?;

    after_visit_mutation(&config, &feed, &visit, MutationKind::Update);

    Ok(Json(json!(visit)))
}

#[axum::debug_handler]
pub async fn refund(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Extension(feed): Extension<Arc<ChangeFeed>>,
    Path(visit_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = VisitService::new(&config);

    let visit = service
        .refund(visit_id, auth.token())
        .await
        .map_err(AppError::from)?;

    after_visit_mutation(&config, &feed, &visit, MutationKind::Update);

    Ok(Json(json!(visit)))
}

#[axum::debug_handler]
pub async fn delete_visit(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Extension(feed): Extension<Arc<ChangeFeed>>,
    Path(visit_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    info!("Visit {} deletion requested by staff {}", visit_id, user.id);

    let service = VisitService::new(&config);

    let visit = service
        .delete_visit(visit_id, auth.token())
        .await
        .map_err(AppError::from)?;

    after_visit_mutation(&config, &feed, &visit, MutationKind::Delete);

    Ok(Json(json!({ "deleted": visit.uid })))
}

enum MutationKind {
    Insert,
    Update,
    Delete,
}

/// Post-mutation fan-out: notify subscribers and refresh the day's
/// aggregate. Both are best-effort; the mutation already succeeded.
fn after_visit_mutation(
    config: &Arc<AppConfig>,
    feed: &Arc<ChangeFeed>,
    visit: &Visit,
    kind: MutationKind,
) {
    let id = visit.id.to_string();
    match kind {
        MutationKind::Insert => feed.publish_insert("visits", &id, visit.visit_date),
        MutationKind::Update => feed.publish_update("visits", &id, visit.visit_date),
        MutationKind::Delete => feed.publish_delete("visits", &id, visit.visit_date),
    }

    QueueSummaryAggregator::refresh_best_effort(config.clone(), feed.clone(), visit.visit_date);
}
