use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub clinic_code: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            clinic_code: "XCARE".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            supabase_url: base_url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            clinic_code: self.clinic_code.clone(),
            port: 3000,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "staff@example.com".to_string(),
            role: "staff".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn staff(email: &str) -> Self {
        Self::new(email, "staff")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Canned PostgREST rows for mocking the storage backend in tests.
pub struct MockPostgrestResponses;

impl MockPostgrestResponses {
    pub fn visit_response(uid: &str, token_number: i32, visit_status: &str) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "uid": uid,
            "token_number": token_number,
            "visit_date": "2025-06-02",
            "patient_name": "Test Patient",
            "age": 34,
            "phone": "0851234567",
            "email": "patient@example.com",
            "gender": "female",
            "address": null,
            "reason": "General checkup",
            "symptoms": null,
            "medical_history": null,
            "allergies": null,
            "medications": null,
            "emergency_contact": null,
            "payment_method": "clinic",
            "payment_status": "pending",
            "payment_id": null,
            "payment_amount": 500.0,
            "visit_status": visit_status,
            "queue_position": token_number,
            "estimated_time": format!("{} minutes", token_number * 15),
            "arrived_at": null,
            "consultation_start_time": null,
            "consultation_end_time": null,
            "completed_at": null,
            "cancelled_at": null,
            "notes": null,
            "diagnosis": null,
            "treatment_plan": null,
            "follow_up_date": null,
            "follow_up_instructions": null,
            "prescription_id": null,
            "prescription_url": null,
            "prescription_notes": null,
            "doctor_rating": null,
            "feedback": null,
            "created_at": "2025-06-02T08:30:00Z",
            "updated_at": "2025-06-02T08:30:00Z"
        })
    }

    pub fn settings_response() -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "clinic_name": "XCare Family Clinic",
            "clinic_address": "12 Harbour Road",
            "clinic_phone": "015550123",
            "clinic_email": "desk@xcare.example",
            "logo_url": null,
            "doctor_name": "Dr. R. Menon",
            "doctor_qualifications": "MBBS, MD",
            "doctor_specialization": "General Practice",
            "doctor_photo_url": null,
            "morning_shift": "9:00 AM - 1:00 PM",
            "evening_shift": "5:00 PM - 9:00 PM",
            "consultation_fee": 500.0,
            "average_consultation_time": 15,
            "online_payment_enabled": true,
            "clinic_payment_enabled": true,
            "max_tokens_per_day": 100,
            "operating_days": ["mon", "tue", "wed", "thu", "fri", "sat"],
            "holiday_dates": [],
            "updated_at": "2025-06-01T00:00:00Z"
        })
    }

    pub fn queue_summary_response(date: &str) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "summary_date": date,
            "total_appointments": 5,
            "total_waiting": 2,
            "total_completed": 2,
            "total_cancelled": 1,
            "current_token": 3,
            "estimated_wait_time": 30,
            "total_revenue": 1000.0,
            "updated_at": "2025-06-02T12:00:00Z"
        })
    }

    pub fn prescription_response(visit_id: &str) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "visit_id": visit_id,
            "medication_text": "Paracetamol 500mg, twice daily for 3 days",
            "file_url": null,
            "notes": "Plenty of fluids",
            "issued_at": "2025-06-02T11:45:00Z",
            "created_at": "2025-06-02T11:45:00Z",
            "updated_at": "2025-06-02T11:45:00Z"
        })
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "message": message,
            "code": code
        })
    }
}
