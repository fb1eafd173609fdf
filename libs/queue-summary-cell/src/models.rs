use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-day materialized aggregate over visits. A cache, never the source
/// of truth: every field is derivable from the day's visit rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub summary_date: NaiveDate,
    pub total_appointments: i32,
    /// upcoming + arrived
    pub total_waiting: i32,
    pub total_completed: i32,
    /// cancelled + no_show
    pub total_cancelled: i32,
    /// Token of the visit currently in consultation, if any.
    pub current_token: Option<i32>,
    /// total_waiting x average consultation minutes.
    pub estimated_wait_time: i32,
    /// Sum of payment_amount over paid visits.
    pub total_revenue: f64,
    pub updated_at: DateTime<Utc>,
}

/// The slice of a visit row the aggregator needs. Read straight off the
/// visits table with a column projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitSnapshot {
    pub token_number: i32,
    pub visit_status: String,
    pub payment_status: String,
    pub payment_amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum SummaryError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}
