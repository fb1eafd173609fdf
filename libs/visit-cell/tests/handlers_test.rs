use std::sync::Arc;

use assert_matches::assert_matches;
use axum::extract::{Extension, Path, State};
use axum::Json;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path as url_path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use realtime_cell::ChangeFeed;
use shared_models::error::AppError;
use shared_utils::test_utils::TestConfig;
use visit_cell::handlers::{book_visit, get_visit_by_uid};
use visit_cell::models::*;

fn booking_request(name: &str) -> BookVisitRequest {
    BookVisitRequest {
        patient_name: name.to_string(),
        age: None,
        phone: Some("0851234567".to_string()),
        email: None,
        gender: None,
        address: None,
        reason: Some("Follow-up".to_string()),
        symptoms: None,
        medical_history: None,
        allergies: None,
        medications: None,
        emergency_contact: None,
        payment_method: PaymentMethod::Clinic,
    }
}

fn stored_visit(uid: &str, token: i32) -> serde_json::Value {
    json!({
        "id": Uuid::new_v4(),
        "uid": uid,
        "token_number": token,
        "visit_date": Utc::now().date_naive(),
        "patient_name": "Asha",
        "age": null,
        "phone": "0851234567",
        "email": null,
        "gender": null,
        "address": null,
        "reason": "Follow-up",
        "symptoms": null,
        "medical_history": null,
        "allergies": null,
        "medications": null,
        "emergency_contact": null,
        "payment_method": "clinic",
        "payment_status": "pending",
        "payment_id": null,
        "payment_amount": 500.0,
        "visit_status": "upcoming",
        "queue_position": token,
        "estimated_time": format!("{} minutes", token * 15),
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
        "created_at": Utc::now().to_rfc3339(),
        "updated_at": Utc::now().to_rfc3339()
    })
}

#[tokio::test]
async fn test_book_visit_returns_confirmation_with_qr_payload() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(url_path("/rest/v1/clinic_settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(url_path("/rest/v1/visits"))
        .and(query_param("select", "token_number"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(url_path("/rest/v1/visits"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!([stored_visit("XC-001", 1)])),
        )
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_base_url(&mock_server.uri()).to_arc();
    let feed = Arc::new(ChangeFeed::new());

    let Json(body) = book_visit(
        State(config),
        Extension(feed),
        Json(booking_request("Asha")),
    )
    .await
    .unwrap();

    assert_eq!(body["visit"]["uid"], "XC-001");
    let qr_payload = body["qr_payload"].as_str().unwrap();
    assert!(qr_payload.contains("XC-001"));
    assert!(qr_payload.contains("XCARE"));
}

#[tokio::test]
async fn test_book_visit_validation_error_is_bad_request() {
    let mock_server = MockServer::start().await;

    let config = TestConfig::with_base_url(&mock_server.uri()).to_arc();
    let feed = Arc::new(ChangeFeed::new());

    let result = book_visit(
        State(config),
        Extension(feed),
        Json(booking_request("")),
    )
    .await;

    assert_matches!(result, Err(AppError::ValidationError(_)));
}

#[tokio::test]
async fn test_booking_publishes_visit_insert_event() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(url_path("/rest/v1/clinic_settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(url_path("/rest/v1/visits"))
        .and(query_param("select", "token_number"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(url_path("/rest/v1/visits"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!([stored_visit("XC-001", 1)])),
        )
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_base_url(&mock_server.uri()).to_arc();
    let feed = Arc::new(ChangeFeed::new());
    let mut rx = feed.subscribe();

    book_visit(
        State(config),
        Extension(feed),
        Json(booking_request("Asha")),
    )
    .await
    .unwrap();

    let event = rx.recv().await.unwrap();
    assert_eq!(event.table, "visits");
    assert_eq!(event.kind, realtime_cell::ChangeKind::Insert);
}

#[tokio::test]
async fn test_tracking_lookup_miss_is_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(url_path("/rest/v1/visits"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_base_url(&mock_server.uri()).to_arc();

    let result = get_visit_by_uid(State(config), Path("XC-404".to_string())).await;

    assert_matches!(result, Err(AppError::NotFound(_)));
}
