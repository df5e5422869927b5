use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// What the closure check reports when the closure table cannot be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosureCheckPolicy {
    /// Treat the date as open and let the booking through.
    FailOpen,
    /// Treat the date as closed and reject the booking.
    FailClosed,
}

impl FromStr for ClosureCheckPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail_open" | "open" => Ok(Self::FailOpen),
            "fail_closed" | "closed" => Ok(Self::FailClosed),
            other => Err(format!("unknown closure check policy: {}", other)),
        }
    }
}

/// Scheduling rules shared by slot computation and booking validation.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingPolicy {
    /// Offset of the clinic's civil time from UTC, in minutes (Asia/Kolkata is +330).
    pub clinic_utc_offset_minutes: i32,
    pub closure_check_policy: ClosureCheckPolicy,
    /// Once the clinic-local hour reaches this value, today's morning block closes.
    pub morning_cutoff_hour: u32,
    /// Slots whose hour is at or below this value belong to the morning block.
    pub morning_block_last_hour: u32,
    /// Once the clinic-local hour reaches this value, nothing more can be booked today.
    pub day_cutoff_hour: u32,
    pub slot_load_max_attempts: u32,
    pub slot_load_retry_delay: Duration,
    /// Re-check capacity and duplicates after inserting an appointment.
    pub confirm_placement: bool,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            clinic_utc_offset_minutes: 330,
            closure_check_policy: ClosureCheckPolicy::FailOpen,
            morning_cutoff_hour: 9,
            morning_block_last_hour: 12,
            day_cutoff_hour: 13,
            slot_load_max_attempts: 3,
            slot_load_retry_delay: Duration::from_millis(1000),
            confirm_placement: true,
        }
    }
}

impl BookingPolicy {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            clinic_utc_offset_minutes: parse_env(
                "CLINIC_UTC_OFFSET_MINUTES",
                defaults.clinic_utc_offset_minutes,
            ),
            closure_check_policy: parse_env(
                "CLOSURE_CHECK_POLICY",
                defaults.closure_check_policy,
            ),
            morning_cutoff_hour: parse_env("MORNING_CUTOFF_HOUR", defaults.morning_cutoff_hour),
            morning_block_last_hour: parse_env(
                "MORNING_BLOCK_LAST_HOUR",
                defaults.morning_block_last_hour,
            ),
            day_cutoff_hour: parse_env("DAY_CUTOFF_HOUR", defaults.day_cutoff_hour),
            slot_load_max_attempts: parse_env(
                "SLOT_LOAD_MAX_ATTEMPTS",
                defaults.slot_load_max_attempts,
            )
            .max(1),
            slot_load_retry_delay: Duration::from_millis(parse_env(
                "SLOT_LOAD_RETRY_DELAY_MS",
                defaults.slot_load_retry_delay.as_millis() as u64,
            )),
            confirm_placement: parse_env("CONFIRM_PLACEMENT", defaults.confirm_placement),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub server_port: u16,
    pub booking: BookingPolicy,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            server_port: parse_env("SERVER_PORT", 3000),
            booking: BookingPolicy::from_env(),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }
}

fn parse_env<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, using default {:?}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
