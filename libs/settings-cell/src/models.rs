use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Singleton clinic configuration. One row expected; compiled defaults
/// stand in until the admin saves the settings form once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicSettings {
    pub id: Option<Uuid>,
    pub clinic_name: String,
    pub clinic_address: Option<String>,
    pub clinic_phone: Option<String>,
    pub clinic_email: Option<String>,
    pub logo_url: Option<String>,
    pub doctor_name: String,
    pub doctor_qualifications: Option<String>,
    pub doctor_specialization: Option<String>,
    pub doctor_photo_url: Option<String>,
    pub morning_shift: Option<String>,
    pub evening_shift: Option<String>,
    pub consultation_fee: f64,
    pub average_consultation_time: i32,
    pub online_payment_enabled: bool,
    pub clinic_payment_enabled: bool,
    pub max_tokens_per_day: Option<i32>,
    pub operating_days: Option<Vec<String>>,
    pub holiday_dates: Option<Vec<NaiveDate>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for ClinicSettings {
    fn default() -> Self {
        Self {
            id: None,
            clinic_name: "XCare Clinic".to_string(),
            clinic_address: None,
            clinic_phone: None,
            clinic_email: None,
            logo_url: None,
            doctor_name: "Doctor".to_string(),
            doctor_qualifications: None,
            doctor_specialization: None,
            doctor_photo_url: None,
            morning_shift: Some("9:00 AM - 1:00 PM".to_string()),
            evening_shift: Some("5:00 PM - 9:00 PM".to_string()),
            consultation_fee: 500.0,
            average_consultation_time: 15,
            online_payment_enabled: true,
            clinic_payment_enabled: true,
            max_tokens_per_day: None,
            operating_days: None,
            holiday_dates: None,
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateClinicSettingsRequest {
    pub clinic_name: Option<String>,
    pub clinic_address: Option<String>,
    pub clinic_phone: Option<String>,
    pub clinic_email: Option<String>,
    pub logo_url: Option<String>,
    pub doctor_name: Option<String>,
    pub doctor_qualifications: Option<String>,
    pub doctor_specialization: Option<String>,
    pub doctor_photo_url: Option<String>,
    pub morning_shift: Option<String>,
    pub evening_shift: Option<String>,
    pub consultation_fee: Option<f64>,
    pub average_consultation_time: Option<i32>,
    pub online_payment_enabled: Option<bool>,
    pub clinic_payment_enabled: Option<bool>,
    pub max_tokens_per_day: Option<i32>,
    pub operating_days: Option<Vec<String>>,
    pub holiday_dates: Option<Vec<NaiveDate>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum SettingsError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
