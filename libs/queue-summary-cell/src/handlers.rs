use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::services::aggregator::QueueSummaryAggregator;

/// Live queue for the patient-facing tracking page.
#[axum::debug_handler]
pub async fn get_today_queue(
    State(config): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let aggregator = QueueSummaryAggregator::new(&config);

    let summary = aggregator
        .get_summary(Utc::now().date_naive(), None)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(json!(summary)))
}

#[axum::debug_handler]
pub async fn get_queue_by_date(
    State(config): State<Arc<AppConfig>>,
    Path(date): Path<String>,
) -> Result<Json<Value>, AppError> {
    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest("Invalid date, expected YYYY-MM-DD".to_string()))?;

    let aggregator = QueueSummaryAggregator::new(&config);

    let summary = aggregator
        .get_summary(date, None)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(json!(summary)))
}
