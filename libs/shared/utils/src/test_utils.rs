use std::sync::Arc;
use std::time::Duration as StdDuration;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use shared_config::{AppConfig, BookingPolicy};

use crate::clinic_time::ClinicTime;
use crate::clock::{Clock, FixedClock};
use crate::state::AppState;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_supabase_url(url: impl Into<String>) -> Self {
        Self {
            supabase_url: url.into(),
            ..Self::default()
        }
    }

    /// Config with the clinic's rules but no delay between slot-load retries.
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            server_port: 0,
            booking: BookingPolicy {
                slot_load_retry_delay: StdDuration::ZERO,
                ..BookingPolicy::default()
            },
        }
    }

    pub fn to_state(&self, clock: &FixedClock) -> AppState {
        AppState::with_clock(self.to_app_config(), Arc::new(clock.clone()))
    }
}

/// Instant of the given wall-clock time at the clinic.
pub fn clinic_instant(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    let date = NaiveDate::from_ymd_opt(year, month, day).expect("valid test date");
    let time = chrono::NaiveTime::from_hms_opt(hour, minute, 0).expect("valid test time");
    ClinicTime::ist().instant_of(date, time).expect("unambiguous fixed offset")
}

pub fn clock_at_clinic_time(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> FixedClock {
    FixedClock::new(clinic_instant(year, month, day, hour, minute))
}

/// A staff member of the admin console.
pub struct TestStaff {
    pub id: String,
    pub email: String,
}

impl TestStaff {
    pub fn named(email: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
        }
    }

    pub fn reception() -> Self {
        Self::named("reception@clinic.example")
    }
}

/// HS256 session tokens shaped like the hosted auth service issues them.
pub struct SessionTokens;

impl SessionTokens {
    pub fn signed(staff: &TestStaff, secret: &str, issued_at: DateTime<Utc>, lifetime: Duration) -> String {
        let header = json!({ "alg": "HS256", "typ": "JWT" });
        let claims = json!({
            "sub": staff.id,
            "email": staff.email,
            "role": "authenticated",
            "iat": issued_at.timestamp(),
            "exp": (issued_at + lifetime).timestamp(),
        });

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header.to_string()),
            URL_SAFE_NO_PAD.encode(claims.to_string()),
        );

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("hmac accepts any key");
        mac.update(signing_input.as_bytes());

        format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
    }

    /// Valid for an hour from the clock's current instant.
    pub fn valid_at(staff: &TestStaff, secret: &str, clock: &dyn Clock) -> String {
        Self::signed(staff, secret, clock.now(), Duration::hours(1))
    }

    /// Lapsed an hour before the clock's current instant.
    pub fn expired_at(staff: &TestStaff, secret: &str, clock: &dyn Clock) -> String {
        Self::signed(staff, secret, clock.now() - Duration::hours(2), Duration::hours(1))
    }

    pub fn forged(staff: &TestStaff, clock: &dyn Clock) -> String {
        Self::valid_at(staff, "not-the-project-secret", clock)
    }
}

/// Row shapes as the hosted store returns them.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn working_hours_row(day: &str, is_working: bool, slots: &[(&str, u32)]) -> serde_json::Value {
        json!({
            "id": 1,
            "day": day,
            "is_working": is_working,
            "morning_start": "09:30 AM",
            "morning_end": "12:30 PM",
            "evening_start": "05:00 PM",
            "evening_end": "08:00 PM",
            "slot_interval": 30,
            "slots": slots.iter()
                .map(|(time, max)| json!({ "time": time, "maxBookings": max }))
                .collect::<Vec<_>>()
        })
    }

    pub fn mr_weekday_row(day: &str, is_working: bool, slots: &[(&str, u32)]) -> serde_json::Value {
        json!({
            "id": 1,
            "day": day,
            "is_working": is_working,
            "slots": slots.iter()
                .map(|(time, max)| json!({ "time": time, "maxBookings": max }))
                .collect::<Vec<_>>()
        })
    }

    pub fn closure_row(date: &str, reason: &str) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "date": date,
            "reason": reason,
            "created_at": "2026-01-01T00:00:00Z"
        })
    }

    pub fn appointment_row(name: &str, phone: &str, date: &str, time: &str, status: &str) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "name": name,
            "phone": phone,
            "age": 34,
            "city": "Pune",
            "appointment_date": date,
            "appointment_time": time,
            "status": status,
            "patient_id": null,
            "created_at": "2026-10-01T08:00:00Z"
        })
    }

    pub fn mr_appointment_row(mr_name: &str, date: &str, time: &str) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "mr_name": mr_name,
            "company_name": "Sunrise Pharma",
            "division_name": "Cardio",
            "contact_no": "9123456780",
            "appointment_date": date,
            "appointment_time": time,
            "created_at": "2026-10-01T08:00:00Z"
        })
    }

    pub fn patient_row(id: Uuid, phone: &str, first_name: &str, last_name: &str, age: u32, address: &str) -> serde_json::Value {
        json!({
            "id": id,
            "phone_number": phone,
            "first_name": first_name,
            "last_name": last_name,
            "age": age,
            "address": address,
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:00:00Z"
        })
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "message": message,
            "code": code
        })
    }
}
