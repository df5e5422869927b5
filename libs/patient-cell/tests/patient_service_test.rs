use assert_matches::assert_matches;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use patient_cell::{patient_routes, PatientDetails, PatientError, PatientService};
use shared_utils::test_utils::{clock_at_clinic_time, MockSupabaseResponses, TestConfig};

const PHONE: &str = "9876543210";

fn service(server: &MockServer) -> PatientService {
    PatientService::new(&TestConfig::with_supabase_url(server.uri()).to_app_config())
}

fn asha() -> PatientDetails {
    PatientDetails { name: "Asha Patel".to_string(), age: 34, city: "Pune".to_string() }
}

async fn mock_lookup(server: &MockServer, rows: Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("phone_number", format!("eq.{}", PHONE)))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_find_by_phone() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();
    mock_lookup(&server, json!([MockSupabaseResponses::patient_row(id, PHONE, "Asha", "Patel", 34, "Pune")])).await;

    let patient = service(&server).find_by_phone(PHONE, None).await.unwrap().unwrap();

    assert_eq!(patient.id, id);
    assert_eq!(patient.full_name(), "Asha Patel");
}

#[tokio::test]
async fn test_malformed_phone_is_rejected_without_a_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let result = service(&server).find_by_phone("98765", None).await;
    assert_matches!(result, Err(PatientError::ValidationError(_)));
}

#[tokio::test]
async fn test_unchanged_patient_is_not_rewritten() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();
    mock_lookup(&server, json!([MockSupabaseResponses::patient_row(id, PHONE, "Asha", "Patel", 34, "Pune")])).await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let patient = service(&server).upsert_for_booking(PHONE, &asha(), None, None).await.unwrap();
    assert_eq!(patient.id, id);
}

#[tokio::test]
async fn test_changed_details_update_the_existing_patient() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();
    mock_lookup(&server, json!([MockSupabaseResponses::patient_row(id, PHONE, "Asha", "Patel", 33, "Pune")])).await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/patients"))
        .and(query_param("id", format!("eq.{}", id)))
        .and(body_json(json!({
            "first_name": "Asha",
            "last_name": "Patel",
            "age": 34,
            "address": "Pune"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::patient_row(id, PHONE, "Asha", "Patel", 34, "Pune")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let patient = service(&server).upsert_for_booking(PHONE, &asha(), None, None).await.unwrap();
    assert_eq!(patient.age, Some(34));
}

#[tokio::test]
async fn test_unknown_phone_creates_a_patient() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();
    mock_lookup(&server, json!([])).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/patients"))
        .and(body_json(json!({
            "phone_number": PHONE,
            "first_name": "Asha",
            "last_name": "Patel",
            "age": 34,
            "address": "Pune"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::patient_row(id, PHONE, "Asha", "Patel", 34, "Pune")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let patient = service(&server).upsert_for_booking(PHONE, &asha(), None, None).await.unwrap();
    assert_eq!(patient.id, id);
}

#[tokio::test]
async fn test_lookup_route_reports_missing_patient() {
    let server = MockServer::start().await;
    mock_lookup(&server, json!([])).await;

    let state = TestConfig::with_supabase_url(server.uri()).to_state(&clock_at_clinic_time(2026, 10, 19, 10, 0));
    let response = patient_routes(state)
        .oneshot(Request::builder().uri(format!("/patients/lookup?phone={}", PHONE)).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({ "found": false, "patient": null }));
}
