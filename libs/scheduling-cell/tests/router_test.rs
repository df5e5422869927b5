// libs/scheduling-cell/tests/router_test.rs

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_json, header as header_matcher, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scheduling_cell::scheduling_routes;
use shared_utils::FixedClock;
use shared_utils::test_utils::{
    clock_at_clinic_time, MockSupabaseResponses, SessionTokens, TestConfig, TestStaff,
};

fn app(server: &MockServer) -> (Router, TestConfig) {
    let config = TestConfig::with_supabase_url(server.uri());
    let clock = clinic_clock();
    (scheduling_routes(config.to_state(&clock)), config)
}

fn clinic_clock() -> FixedClock {
    clock_at_clinic_time(2026, 10, 19, 10, 0)
}

fn staff_token(config: &TestConfig) -> String {
    SessionTokens::valid_at(&TestStaff::reception(), &config.jwt_secret, &clinic_clock())
}

async fn body_json_of(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_public_slots_endpoint_needs_no_token() {
    let server = MockServer::start().await;
    let (app, _) = app(&server);

    Mock::given(method("GET"))
        .and(path("/rest/v1/clinic_closure_dates"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/working_hours"))
        .and(query_param("day", "eq.Monday"))
        .and(header_matcher("apikey", "test-anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::working_hours_row("Monday", true, &[("09:30 AM", 3), ("10:00 AM", 3)])
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "appointment_time": "10:00 AM" }])))
        .mount(&server)
        .await;

    let response = app
        .oneshot(Request::builder().uri("/slots?date=2026-10-26").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json_of(response).await;
    assert_eq!(body["date"], "2026-10-26");
    assert_eq!(body["slots"], json!([
        { "time": "09:30 AM", "maxBookings": 3, "currentBookings": 0 },
        { "time": "10:00 AM", "maxBookings": 3, "currentBookings": 1 },
    ]));
    assert!(body.get("notice").is_none());
}

#[tokio::test]
async fn test_slot_load_failure_returns_notice() {
    let server = MockServer::start().await;
    let (app, _) = app(&server);

    Mock::given(method("GET"))
        .and(path("/rest/v1/clinic_closure_dates"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/working_hours"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let response = app
        .oneshot(Request::builder().uri("/slots?date=2026-10-26").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json_of(response).await;
    assert_eq!(body["slots"], json!([]));
    assert_eq!(body["notice"], "Failed to load available time slots. Please try again.");
}

#[tokio::test]
async fn test_admin_routes_require_a_valid_token() {
    let server = MockServer::start().await;
    let (app, config) = app(&server);

    let missing = app.clone()
        .oneshot(Request::builder().uri("/admin/closures").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let forged = SessionTokens::forged(&TestStaff::reception(), &clinic_clock());
    let rejected = app.clone()
        .oneshot(
            Request::builder()
                .uri("/admin/mr-weekdays")
                .header(header::AUTHORIZATION, format!("Bearer {}", forged))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(rejected.status(), StatusCode::UNAUTHORIZED);

    let expired = SessionTokens::expired_at(&TestStaff::reception(), &config.jwt_secret, &clinic_clock());
    let rejected = app
        .oneshot(
            Request::builder()
                .uri("/admin/working-hours")
                .header(header::AUTHORIZATION, format!("Bearer {}", expired))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(rejected.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_closure_range_skips_dates_already_closed() {
    let server = MockServer::start().await;
    let (app, config) = app(&server);
    let token = staff_token(&config);

    Mock::given(method("GET"))
        .and(path("/rest/v1/clinic_closure_dates"))
        .and(query_param("date", "gte.2026-11-07"))
        .and(query_param("date", "lte.2026-11-09"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "date": "2026-11-08" }])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/clinic_closure_dates"))
        .and(header_matcher("Authorization", format!("Bearer {}", token).as_str()))
        .and(body_json(json!([
            { "date": "2026-11-07", "reason": "Clinic Closed" },
            { "date": "2026-11-09", "reason": "Clinic Closed" },
        ])))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::closure_row("2026-11-07", "Clinic Closed"),
            MockSupabaseResponses::closure_row("2026-11-09", "Clinic Closed"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/admin/closures")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({
                    "start_date": "2026-11-07",
                    "end_date": "2026-11-09",
                    "reason": "  "
                }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json_of(response).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["created"][0]["date"], "2026-11-07");
    assert_eq!(body["created"][1]["reason"], "Clinic Closed");
}

#[tokio::test]
async fn test_inverted_closure_range_is_rejected() {
    let server = MockServer::start().await;
    let (app, config) = app(&server);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/admin/mr-closures")
                .header(header::AUTHORIZATION, format!("Bearer {}", staff_token(&config)))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({
                    "start_date": "2026-11-09",
                    "end_date": "2026-11-07"
                }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reopening_unknown_closure_is_not_found() {
    let server = MockServer::start().await;
    let (app, config) = app(&server);

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/mr_closure_dates"))
        .and(query_param("date", "eq.2026-12-25"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/admin/mr-closures/2026-12-25")
                .header(header::AUTHORIZATION, format!("Bearer {}", staff_token(&config)))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_working_hours_update_regenerates_slots() {
    let server = MockServer::start().await;
    let (app, config) = app(&server);

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/working_hours"))
        .and(query_param("day", "eq.Tuesday"))
        .and(body_json(json!({
            "is_working": true,
            "morning_start": "09:30 AM",
            "morning_end": "10:30 AM",
            "evening_start": null,
            "evening_end": null,
            "slot_interval": 30,
            "slots": [
                { "time": "09:30 AM", "maxBookings": 2 },
                { "time": "10:00 AM", "maxBookings": 2 },
            ],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::working_hours_row("Tuesday", true, &[("09:30 AM", 2), ("10:00 AM", 2)])
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/admin/working-hours/tuesday")
                .header(header::AUTHORIZATION, format!("Bearer {}", staff_token(&config)))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({
                    "is_working": true,
                    "morning_start": "09:30 AM",
                    "morning_end": "10:30 AM",
                    "slot_interval": 30,
                    "max_bookings_per_slot": 2
                }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json_of(response).await;
    assert_eq!(body["day"], "Tuesday");
    assert_eq!(body["slots"].as_array().unwrap().len(), 2);
}
