use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Medication record issued against a completed consultation. The visit
/// row carries a back-link so the patient's tracking page can offer the
/// download without a join.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prescription {
    pub id: Uuid,
    pub visit_id: Uuid,
    pub medication_text: String,
    pub file_url: Option<String>,
    pub notes: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePrescriptionRequest {
    pub visit_id: Uuid,
    pub medication_text: String,
    pub file_url: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum PrescriptionError {
    #[error("Prescription not found")]
    NotFound,

    #[error("Visit not found")]
    VisitNotFound,

    #[error("Prescriptions can only be issued during or after consultation")]
    VisitNotConsulted,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<PrescriptionError> for shared_models::error::AppError {
    fn from(err: PrescriptionError) -> Self {
        use shared_models::error::AppError;
        match err {
            PrescriptionError::NotFound => {
                AppError::NotFound("Prescription not found".to_string())
            }
            PrescriptionError::VisitNotFound => AppError::NotFound("Visit not found".to_string()),
            PrescriptionError::VisitNotConsulted => AppError::BadRequest(
                "Prescriptions can only be issued during or after consultation".to_string(),
            ),
            PrescriptionError::ValidationError(msg) => AppError::ValidationError(msg),
            PrescriptionError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
