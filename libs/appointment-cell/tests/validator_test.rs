// libs/appointment-cell/tests/validator_test.rs

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::{BookingValidation, BookingValidator};
use scheduling_cell::BookingChannel;
use shared_utils::test_utils::{clinic_instant, clock_at_clinic_time, MockSupabaseResponses, TestConfig};
use shared_utils::FixedClock;

const NAME: &str = "Asha Patel";
const PHONE: &str = "9876543210";
const NEXT_MONDAY: &str = "2026-10-26";

fn date(raw: &str) -> NaiveDate {
    raw.parse().unwrap()
}

fn validator(server: &MockServer, clock: &FixedClock) -> BookingValidator {
    let config = TestConfig::with_supabase_url(server.uri()).to_app_config();
    BookingValidator::new(&config, Arc::new(clock.clone()), BookingChannel::Clinic)
}

async fn mock_open_mondays(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/clinic_closure_dates"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/working_hours"))
        .and(query_param("day", "eq.Monday"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::working_hours_row("Monday", true, &[("09:30 AM", 3), ("10:00 AM", 3)])
        ])))
        .mount(server)
        .await;
}

async fn mock_pending_in_slot(server: &MockServer, time: &str, count: usize) {
    let rows: Vec<Value> = (0..count).map(|_| json!({ "appointment_time": time })).collect();
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("status", "eq.pending"))
        .and(query_param("appointment_time", format!("eq.{}", time)))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .mount(server)
        .await;
}

async fn mock_outstanding(server: &MockServer, since: &str, rows: Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("name", format!("eq.{}", NAME)))
        .and(query_param("phone", format!("eq.{}", PHONE)))
        .and(query_param("appointment_date", format!("gte.{}", since)))
        .and(query_param("status", "eq.pending"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .mount(server)
        .await;
}

fn rejected(message: &str) -> BookingValidation {
    BookingValidation { is_valid: false, error: Some(message.to_string()) }
}

#[tokio::test]
async fn test_open_slot_is_valid() {
    let server = MockServer::start().await;
    let clock = clock_at_clinic_time(2026, 10, 19, 10, 0);
    mock_open_mondays(&server).await;
    mock_pending_in_slot(&server, "09:30 AM", 2).await;
    mock_outstanding(&server, "2026-10-19", json!([])).await;

    let result = validator(&server, &clock)
        .validate(NAME, PHONE, Some(date(NEXT_MONDAY)), Some("09:30 AM"))
        .await;

    assert_eq!(result, BookingValidation::valid());
}

#[tokio::test]
async fn test_full_slot_is_rejected() {
    let server = MockServer::start().await;
    let clock = clock_at_clinic_time(2026, 10, 19, 10, 0);
    mock_open_mondays(&server).await;
    mock_pending_in_slot(&server, "09:30 AM", 3).await;
    mock_outstanding(&server, "2026-10-19", json!([])).await;

    let result = validator(&server, &clock)
        .validate("Ravi Kumar", "9123456780", Some(date(NEXT_MONDAY)), Some("09:30 AM"))
        .await;

    assert_eq!(result, rejected("This time slot is fully booked. Please select another time."));
}

#[tokio::test]
async fn test_closed_date_rejection_carries_reason() {
    let server = MockServer::start().await;
    let clock = clock_at_clinic_time(2026, 10, 19, 10, 0);
    Mock::given(method("GET"))
        .and(path("/rest/v1/clinic_closure_dates"))
        .and(query_param("date", "eq.2026-11-09"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::closure_row("2026-11-09", "Diwali")
        ])))
        .mount(&server)
        .await;

    let result = validator(&server, &clock)
        .validate(NAME, PHONE, Some(date("2026-11-09")), Some("09:30 AM"))
        .await;

    assert!(!result.is_valid);
    assert!(result.error.unwrap().contains("Diwali"));
}

#[tokio::test]
async fn test_outstanding_booking_blocks_until_its_date_has_passed() {
    let server = MockServer::start().await;
    let clock = clock_at_clinic_time(2026, 10, 19, 10, 0);
    mock_open_mondays(&server).await;
    mock_pending_in_slot(&server, "10:00 AM", 0).await;
    mock_outstanding(
        &server,
        "2026-10-19",
        json!([{ "id": uuid::Uuid::new_v4(), "appointment_date": NEXT_MONDAY }]),
    ).await;
    mock_outstanding(&server, "2026-10-27", json!([])).await;

    let validator = validator(&server, &clock);

    let result = validator
        .validate(NAME, PHONE, Some(date("2026-11-02")), Some("10:00 AM"))
        .await;
    assert_eq!(result, rejected(
        "You already have an upcoming appointment on 2026-10-26. You can book a new appointment after that date has passed."
    ));

    clock.set(clinic_instant(2026, 10, 27, 8, 0));
    let result = validator
        .validate(NAME, PHONE, Some(date("2026-11-02")), Some("10:00 AM"))
        .await;
    assert_eq!(result, BookingValidation::valid());
}

#[tokio::test]
async fn test_validation_is_repeatable() {
    let server = MockServer::start().await;
    let clock = clock_at_clinic_time(2026, 10, 19, 10, 0);
    mock_open_mondays(&server).await;
    mock_pending_in_slot(&server, "09:30 AM", 3).await;
    mock_outstanding(&server, "2026-10-19", json!([])).await;

    let validator = validator(&server, &clock);
    let first = validator.validate(NAME, PHONE, Some(date(NEXT_MONDAY)), Some("09:30 AM")).await;
    let second = validator.validate(NAME, PHONE, Some(date(NEXT_MONDAY)), Some("09:30 AM")).await;

    assert_eq!(first, second);
    assert!(!first.is_valid);
}

#[tokio::test]
async fn test_input_errors_need_no_backend() {
    let server = MockServer::start().await;
    let clock = clock_at_clinic_time(2026, 10, 19, 10, 0);
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let validator = validator(&server, &clock);

    assert_eq!(
        validator.validate(NAME, PHONE, None, Some("09:30 AM")).await,
        rejected("Please select an appointment date"),
    );
    assert_eq!(
        validator.validate(NAME, PHONE, Some(date(NEXT_MONDAY)), Some("  ")).await,
        rejected("Please select a time slot"),
    );
    assert_eq!(
        validator.validate(NAME, "98765 43210", Some(date(NEXT_MONDAY)), Some("09:30 AM")).await,
        rejected("Please enter a valid 10-digit phone number"),
    );
    assert_eq!(
        validator.validate(NAME, "९८७६५४३२१०", Some(date(NEXT_MONDAY)), Some("09:30 AM")).await,
        rejected("Please enter a valid 10-digit phone number"),
    );
    assert_eq!(
        validator.validate(NAME, PHONE, Some(date("2026-10-18")), Some("09:30 AM")).await,
        rejected("Please select a date that is not in the past"),
    );
}

#[tokio::test]
async fn test_completed_visit_today_does_not_block_follow_up() {
    let server = MockServer::start().await;
    let clock = clock_at_clinic_time(2026, 10, 19, 10, 0);
    Mock::given(method("GET"))
        .and(path("/rest/v1/clinic_closure_dates"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/working_hours"))
        .and(query_param("day", "eq.Monday"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::working_hours_row("Monday", true, &[("09:30 AM", 3), ("05:00 PM", 3)])
        ])))
        .mount(&server)
        .await;
    mock_pending_in_slot(&server, "05:00 PM", 0).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("name", format!("eq.{}", NAME)))
        .and(query_param("phone", format!("eq.{}", PHONE)))
        .and(query_param("status", "eq.pending"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    // This morning's visit, already marked completed.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("name", format!("eq.{}", NAME)))
        .and(query_param("phone", format!("eq.{}", PHONE)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": uuid::Uuid::new_v4(), "appointment_date": "2026-10-19" }
        ])))
        .expect(0)
        .mount(&server)
        .await;

    let result = validator(&server, &clock)
        .validate(NAME, PHONE, Some(date("2026-10-19")), Some("05:00 PM"))
        .await;

    assert_eq!(result, BookingValidation::valid());
}

#[tokio::test]
async fn test_unknown_slot_and_non_working_day() {
    let server = MockServer::start().await;
    let clock = clock_at_clinic_time(2026, 10, 19, 10, 0);
    mock_open_mondays(&server).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/working_hours"))
        .and(query_param("day", "eq.Sunday"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::working_hours_row("Sunday", false, &[])
        ])))
        .mount(&server)
        .await;

    let validator = validator(&server, &clock);

    assert_eq!(
        validator.validate(NAME, PHONE, Some(date(NEXT_MONDAY)), Some("11:00 AM")).await,
        rejected("Invalid time slot selected"),
    );
    assert_eq!(
        validator.validate(NAME, PHONE, Some(date("2026-10-25")), Some("09:30 AM")).await,
        rejected("The clinic is closed on this day"),
    );
}

#[tokio::test]
async fn test_backend_failure_becomes_generic_message() {
    let server = MockServer::start().await;
    let clock = clock_at_clinic_time(2026, 10, 19, 10, 0);
    Mock::given(method("GET"))
        .and(path("/rest/v1/clinic_closure_dates"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/working_hours"))
        .respond_with(ResponseTemplate::new(500).set_body_json(
            MockSupabaseResponses::error_response("connection reset", "500"),
        ))
        .mount(&server)
        .await;

    let result = validator(&server, &clock)
        .validate(NAME, PHONE, Some(date(NEXT_MONDAY)), Some("09:30 AM"))
        .await;

    assert_eq!(result, rejected("An unexpected error occurred. Please try again later"));
}

#[tokio::test]
async fn test_mr_bookings_skip_the_duplicate_guard() {
    let server = MockServer::start().await;
    let clock = clock_at_clinic_time(2026, 10, 19, 10, 0);
    let config = TestConfig::with_supabase_url(server.uri()).to_app_config();

    Mock::given(method("GET"))
        .and(path("/rest/v1/mr_closure_dates"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/mr_weekdays"))
        .and(query_param("day", "eq.Monday"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::mr_weekday_row("Monday", true, &[("02:00 PM", 2)])
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/mr_appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "appointment_time": "02:00 PM" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let validator = BookingValidator::new(&config, Arc::new(clock), BookingChannel::MedicalRepresentative);
    let result = validator
        .validate("Ravi Kumar", "9123456780", Some(date(NEXT_MONDAY)), Some("02:00 PM"))
        .await;

    assert_eq!(result, BookingValidation::valid());
}
