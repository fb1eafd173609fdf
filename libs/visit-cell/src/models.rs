use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// CORE VISIT MODELS
// ==============================================================================

/// One patient booking/encounter. Source of truth for queue state, payment
/// state, and clinical notes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Visit {
    pub id: Uuid,
    /// Human-facing booking identifier, `XC-NNN`. Immutable.
    pub uid: String,
    /// Queue ticket for the day. Unique within `visit_date`. Immutable.
    pub token_number: i32,
    /// UTC calendar date of creation; the day-scope key for tokens and
    /// aggregation.
    pub visit_date: NaiveDate,

    pub patient_name: String,
    pub age: Option<i32>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub gender: Option<Gender>,
    pub address: Option<String>,
    pub reason: Option<String>,
    pub symptoms: Option<String>,
    pub medical_history: Option<String>,
    pub allergies: Option<String>,
    pub medications: Option<String>,
    pub emergency_contact: Option<String>,

    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub payment_id: Option<String>,
    pub payment_amount: f64,

    pub visit_status: VisitStatus,
    pub queue_position: i32,
    pub estimated_time: String,
    pub arrived_at: Option<DateTime<Utc>>,
    pub consultation_start_time: Option<DateTime<Utc>>,
    pub consultation_end_time: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,

    pub notes: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment_plan: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
    pub follow_up_instructions: Option<String>,
    pub prescription_id: Option<Uuid>,
    pub prescription_url: Option<String>,
    pub prescription_notes: Option<String>,
    pub doctor_rating: Option<i32>,
    pub feedback: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisitStatus {
    Upcoming,
    Arrived,
    InConsultation,
    Completed,
    Cancelled,
    NoShow,
}

impl VisitStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            VisitStatus::Completed | VisitStatus::Cancelled | VisitStatus::NoShow
        )
    }

    /// Waiting visits occupy the queue: booked or checked in, not yet seen.
    pub fn is_waiting(&self) -> bool {
        matches!(self, VisitStatus::Upcoming | VisitStatus::Arrived)
    }
}

impl fmt::Display for VisitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VisitStatus::Upcoming => write!(f, "upcoming"),
            VisitStatus::Arrived => write!(f, "arrived"),
            VisitStatus::InConsultation => write!(f, "in_consultation"),
            VisitStatus::Completed => write!(f, "completed"),
            VisitStatus::Cancelled => write!(f, "cancelled"),
            VisitStatus::NoShow => write!(f, "no_show"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Online,
    Clinic,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::Online => write!(f, "online"),
            PaymentMethod::Clinic => write!(f, "clinic"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Paid => write!(f, "paid"),
            PaymentStatus::Refunded => write!(f, "refunded"),
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookVisitRequest {
    pub patient_name: String,
    pub age: Option<i32>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub gender: Option<Gender>,
    pub address: Option<String>,
    pub reason: Option<String>,
    pub symptoms: Option<String>,
    pub medical_history: Option<String>,
    pub allergies: Option<String>,
    pub medications: Option<String>,
    pub emergency_contact: Option<String>,
    pub payment_method: PaymentMethod,
}

/// Booking confirmation: the stored visit plus the QR payload the patient
/// presents at the desk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookVisitResponse {
    pub visit: Visit,
    pub qr_payload: String,
}

/// Partial clinical/record update applied by staff. Queue identity fields
/// (uid, token, visit_date) are not patchable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateVisitRequest {
    pub patient_name: Option<String>,
    pub age: Option<i32>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub gender: Option<Gender>,
    pub address: Option<String>,
    pub reason: Option<String>,
    pub symptoms: Option<String>,
    pub medical_history: Option<String>,
    pub allergies: Option<String>,
    pub medications: Option<String>,
    pub emergency_contact: Option<String>,
    pub notes: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment_plan: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
    pub follow_up_instructions: Option<String>,
    pub prescription_notes: Option<String>,
    pub doctor_rating: Option<i32>,
    pub feedback: Option<String>,
}

impl UpdateVisitRequest {
    pub fn is_empty(&self) -> bool {
        serde_json::to_value(self)
            .map(|v| {
                v.as_object()
                    .map(|m| m.values().all(|f| f.is_null()))
                    .unwrap_or(true)
            })
            .unwrap_or(true)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub new_status: VisitStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckinScanRequest {
    /// Raw scanned text: the JSON envelope, or anything containing an
    /// `XC-NNN` pattern.
    pub payload: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitSearchQuery {
    /// Case-insensitive substring matched against name, uid and phone.
    pub q: Option<String>,
    pub status: Option<VisitStatus>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum VisitError {
    #[error("Visit not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Daily booking capacity reached")]
    CapacityReached,

    #[error("Could not reserve a queue token after repeated conflicts")]
    TokenConflict,

    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("Invalid payment state: {0}")]
    InvalidPaymentState(String),

    #[error("Could not read QR payload: {0}")]
    InvalidQrPayload(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<VisitError> for shared_models::error::AppError {
    fn from(err: VisitError) -> Self {
        use shared_models::error::AppError;
        match err {
            VisitError::NotFound => AppError::NotFound("Visit not found".to_string()),
            VisitError::ValidationError(msg) => AppError::ValidationError(msg),
            VisitError::CapacityReached => {
                AppError::Conflict("Daily booking capacity reached".to_string())
            }
            VisitError::TokenConflict => {
                AppError::Conflict("Booking failed, please try again".to_string())
            }
            VisitError::InvalidStatusTransition { from, to } => {
                AppError::BadRequest(format!("Invalid status transition from {} to {}", from, to))
            }
            VisitError::InvalidPaymentState(msg) => AppError::BadRequest(msg),
            VisitError::InvalidQrPayload(msg) => AppError::BadRequest(msg),
            VisitError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
