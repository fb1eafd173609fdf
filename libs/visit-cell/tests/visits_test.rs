use assert_matches::assert_matches;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_utils::test_utils::{MockPostgrestResponses, TestConfig};
use visit_cell::models::*;
use visit_cell::services::visits::VisitService;

fn service_for(mock_server: &MockServer) -> VisitService {
    let config = TestConfig::with_base_url(&mock_server.uri()).to_app_config();
    VisitService::new(&config)
}

fn booking_request(name: &str) -> BookVisitRequest {
    BookVisitRequest {
        patient_name: name.to_string(),
        age: Some(31),
        phone: Some("0851234567".to_string()),
        email: None,
        gender: Some(Gender::Female),
        address: None,
        reason: Some("Fever".to_string()),
        symptoms: None,
        medical_history: None,
        allergies: None,
        medications: None,
        emergency_contact: None,
        payment_method: PaymentMethod::Clinic,
    }
}

/// Settings table empty: booking runs on compiled defaults (fee 500,
/// average 15 minutes, both payment channels on, no daily cap).
async fn mount_default_settings(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/clinic_settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(mock_server)
        .await;
}

async fn mount_max_token(mock_server: &MockServer, max_token: Option<i32>) {
    let body = match max_token {
        Some(token) => json!([{ "token_number": token }]),
        None => json!([]),
    };
    Mock::given(method("GET"))
        .and(path("/rest/v1/visits"))
        .and(query_param("select", "token_number"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(mock_server)
        .await;
}

fn stored_visit(uid: &str, token: i32, name: &str) -> serde_json::Value {
    let today = Utc::now().date_naive();
    json!({
        "id": Uuid::new_v4(),
        "uid": uid,
        "token_number": token,
        "visit_date": today,
        "patient_name": name,
        "age": 31,
        "phone": "0851234567",
        "email": null,
        "gender": "female",
        "address": null,
        "reason": "Fever",
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
async fn test_booking_takes_next_token_of_the_day() {
    let mock_server = MockServer::start().await;
    mount_default_settings(&mock_server).await;
    // Two visits already booked today, highest token 2
    mount_max_token(&mock_server, Some(2)).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/visits"))
        .and(body_partial_json(json!({
            "uid": "XC-003",
            "token_number": 3,
            "queue_position": 3,
            "estimated_time": "45 minutes",
            "patient_name": "Asha",
            "payment_method": "clinic",
            "payment_status": "pending",
            "visit_status": "upcoming",
            "payment_amount": 500.0
        })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!([stored_visit("XC-003", 3, "Asha")])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let visit = service.book_visit(booking_request("Asha")).await.unwrap();

    assert_eq!(visit.uid, "XC-003");
    assert_eq!(visit.token_number, 3);
    assert_eq!(visit.queue_position, 3);
    assert_eq!(visit.estimated_time, "45 minutes");
    assert_eq!(visit.visit_status, VisitStatus::Upcoming);
    assert_eq!(visit.payment_status, PaymentStatus::Pending);
}

#[tokio::test]
async fn test_first_booking_of_the_day_gets_token_one() {
    let mock_server = MockServer::start().await;
    mount_default_settings(&mock_server).await;
    mount_max_token(&mock_server, None).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/visits"))
        .and(body_partial_json(json!({ "uid": "XC-001", "token_number": 1 })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!([stored_visit("XC-001", 1, "Asha")])),
        )
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let visit = service.book_visit(booking_request("Asha")).await.unwrap();

    assert_eq!(visit.uid, "XC-001");
    assert_eq!(visit.token_number, 1);
}

#[tokio::test]
async fn test_booking_without_name_is_rejected_before_persistence() {
    let mock_server = MockServer::start().await;

    // No storage calls expected at all
    Mock::given(method("POST"))
        .and(path("/rest/v1/visits"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let result = service.book_visit(booking_request("   ")).await;

    assert_matches!(result, Err(VisitError::ValidationError(_)));
}

#[tokio::test]
async fn test_booking_retries_after_losing_token_race() {
    let mock_server = MockServer::start().await;
    mount_default_settings(&mock_server).await;
    mount_max_token(&mock_server, Some(4)).await;

    // First insert loses the race on the per-day uniqueness key
    Mock::given(method("POST"))
        .and(path("/rest/v1/visits"))
        .respond_with(ResponseTemplate::new(409).set_body_json(
            MockPostgrestResponses::error_response(
                "duplicate key value violates unique constraint",
                "23505",
            ),
        ))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/visits"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!([stored_visit("XC-005", 5, "Asha")])),
        )
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let visit = service.book_visit(booking_request("Asha")).await.unwrap();

    assert_eq!(visit.token_number, 5);
}

#[tokio::test]
async fn test_booking_surfaces_failure_after_retries_exhaust() {
    let mock_server = MockServer::start().await;
    mount_default_settings(&mock_server).await;
    mount_max_token(&mock_server, Some(4)).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/visits"))
        .respond_with(ResponseTemplate::new(409).set_body_json(
            MockPostgrestResponses::error_response(
                "duplicate key value violates unique constraint",
                "23505",
            ),
        ))
        .expect(3)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let result = service.book_visit(booking_request("Asha")).await;

    assert_matches!(result, Err(VisitError::TokenConflict));
}

#[tokio::test]
async fn test_booking_respects_daily_capacity() {
    let mock_server = MockServer::start().await;

    let mut settings = MockPostgrestResponses::settings_response();
    settings["max_tokens_per_day"] = json!(10);
    Mock::given(method("GET"))
        .and(path("/rest/v1/clinic_settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([settings])))
        .mount(&mock_server)
        .await;
    mount_max_token(&mock_server, Some(10)).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/visits"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let result = service.book_visit(booking_request("Asha")).await;

    assert_matches!(result, Err(VisitError::CapacityReached));
}

#[tokio::test]
async fn test_lookup_by_uid_miss_is_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/visits"))
        .and(query_param("uid", "eq.XC-999"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let result = service.get_visit_by_uid("XC-999", None).await;

    assert_matches!(result, Err(VisitError::NotFound));
}

#[tokio::test]
async fn test_mark_paid_assigns_receipt_without_touching_queue_state() {
    let mock_server = MockServer::start().await;

    let mut pending = stored_visit("XC-004", 4, "Ravi");
    let visit_id = pending["id"].as_str().unwrap().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/visits"))
        .and(query_param("id", format!("eq.{}", visit_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([pending.clone()])))
        .mount(&mock_server)
        .await;

    pending["payment_status"] = json!("paid");
    pending["payment_id"] = json!("PAY-7F3K2M9QX1AB");

    // The patch must set payment fields and nothing lifecycle-related
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/visits"))
        .and(body_partial_json(json!({ "payment_status": "paid" })))
        .and(body_string_contains("payment_id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([pending])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let visit = service
        .mark_paid(Uuid::parse_str(&visit_id).unwrap(), "staff-token")
        .await
        .unwrap();

    assert_eq!(visit.payment_status, PaymentStatus::Paid);
    assert!(visit.payment_id.is_some());
    assert!(!visit.payment_id.unwrap().is_empty());
    assert_eq!(visit.visit_status, VisitStatus::Upcoming);
}

#[tokio::test]
async fn test_mark_paid_twice_is_rejected() {
    let mock_server = MockServer::start().await;

    let mut paid = stored_visit("XC-004", 4, "Ravi");
    paid["payment_status"] = json!("paid");
    paid["payment_id"] = json!("PAY-7F3K2M9QX1AB");
    let visit_id = paid["id"].as_str().unwrap().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/visits"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([paid])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/visits"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let result = service
        .mark_paid(Uuid::parse_str(&visit_id).unwrap(), "staff-token")
        .await;

    assert_matches!(result, Err(VisitError::InvalidPaymentState(_)));
}

#[tokio::test]
async fn test_cancelling_an_arrived_visit_stamps_cancelled_at() {
    let mock_server = MockServer::start().await;

    let mut arrived = stored_visit("XC-002", 2, "Meera");
    arrived["visit_status"] = json!("arrived");
    arrived["arrived_at"] = json!(Utc::now().to_rfc3339());
    let visit_id = arrived["id"].as_str().unwrap().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/visits"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([arrived.clone()])))
        .mount(&mock_server)
        .await;

    let mut cancelled = arrived.clone();
    cancelled["visit_status"] = json!("cancelled");
    cancelled["cancelled_at"] = json!(Utc::now().to_rfc3339());

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/visits"))
        .and(body_partial_json(json!({ "visit_status": "cancelled" })))
        .and(body_string_contains("cancelled_at"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([cancelled])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let visit = service
        .apply_status(
            Uuid::parse_str(&visit_id).unwrap(),
            StatusUpdateRequest {
                new_status: VisitStatus::Cancelled,
            },
            "staff-token",
        )
        .await
        .unwrap();

    assert_eq!(visit.visit_status, VisitStatus::Cancelled);
    assert!(visit.cancelled_at.is_some());
}

#[tokio::test]
async fn test_completed_visit_rejects_further_transitions() {
    let mock_server = MockServer::start().await;

    let mut completed = stored_visit("XC-001", 1, "Asha");
    completed["visit_status"] = json!("completed");
    let visit_id = completed["id"].as_str().unwrap().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/visits"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([completed])))
        .mount(&mock_server)
        .await;

    // The state machine must reject before any write happens
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/visits"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let result = service
        .apply_status(
            Uuid::parse_str(&visit_id).unwrap(),
            StatusUpdateRequest {
                new_status: VisitStatus::Arrived,
            },
            "staff-token",
        )
        .await;

    assert_matches!(result, Err(VisitError::InvalidStatusTransition { .. }));
}

#[tokio::test]
async fn test_checkin_scan_resolves_uid_and_checks_in() {
    let mock_server = MockServer::start().await;

    let upcoming = stored_visit("XC-006", 6, "Dev");

    Mock::given(method("GET"))
        .and(path("/rest/v1/visits"))
        .and(query_param("uid", "eq.XC-006"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([upcoming.clone()])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/visits"))
        .and(query_param("id", format!("eq.{}", upcoming["id"].as_str().unwrap())))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([upcoming.clone()])))
        .mount(&mock_server)
        .await;

    let mut arrived = upcoming.clone();
    arrived["visit_status"] = json!("arrived");
    arrived["arrived_at"] = json!(Utc::now().to_rfc3339());

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/visits"))
        .and(body_partial_json(json!({ "visit_status": "arrived" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([arrived])))
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);

    // Scanned text instead of a JSON envelope: regex fallback path
    let visit = service
        .check_in_scan("printed slip XC-006", "staff-token")
        .await
        .unwrap();

    assert_eq!(visit.visit_status, VisitStatus::Arrived);
    assert!(visit.arrived_at.is_some());
}

#[tokio::test]
async fn test_search_builds_substring_filter() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/visits"))
        .and(query_param(
            "or",
            "(patient_name.ilike.%asha%,uid.ilike.%asha%,phone.ilike.%asha%)",
        ))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([stored_visit("XC-003", 3, "Asha")])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let visits = service
        .search_visits(
            VisitSearchQuery {
                q: Some("asha".to_string()),
                status: None,
                from_date: None,
                to_date: None,
                limit: None,
                offset: None,
            },
            "staff-token",
        )
        .await
        .unwrap();

    assert_eq!(visits.len(), 1);
    assert_eq!(visits[0].patient_name, "Asha");
}
