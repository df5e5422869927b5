// libs/scheduling-cell/src/models.rs
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

// ==============================================================================
// CHANNELS AND WEEKDAYS
// ==============================================================================

/// Which booking book a request is made against. Patients and medical
/// representatives have separate closures, weekday schedules and bookings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingChannel {
    Clinic,
    MedicalRepresentative,
}

impl BookingChannel {
    pub fn closure_table(&self) -> &'static str {
        match self {
            BookingChannel::Clinic => "clinic_closure_dates",
            BookingChannel::MedicalRepresentative => "mr_closure_dates",
        }
    }

    pub fn schedule_table(&self) -> &'static str {
        match self {
            BookingChannel::Clinic => "working_hours",
            BookingChannel::MedicalRepresentative => "mr_weekdays",
        }
    }

    pub fn bookings_table(&self) -> &'static str {
        match self {
            BookingChannel::Clinic => "appointments",
            BookingChannel::MedicalRepresentative => "mr_appointments",
        }
    }

    /// Only clinic bookings carry a status; MR rows always count.
    pub fn counts_pending_only(&self) -> bool {
        matches!(self, BookingChannel::Clinic)
    }

    pub fn default_closure_reason(&self) -> &'static str {
        match self {
            BookingChannel::Clinic => "Clinic Closed",
            BookingChannel::MedicalRepresentative => "MR Visits Closed",
        }
    }
}

impl fmt::Display for BookingChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingChannel::Clinic => write!(f, "clinic"),
            BookingChannel::MedicalRepresentative => write!(f, "mr"),
        }
    }
}

/// Day key of the weekday schedule tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClinicWeekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl ClinicWeekday {
    pub const ALL: [ClinicWeekday; 7] = [
        ClinicWeekday::Monday,
        ClinicWeekday::Tuesday,
        ClinicWeekday::Wednesday,
        ClinicWeekday::Thursday,
        ClinicWeekday::Friday,
        ClinicWeekday::Saturday,
        ClinicWeekday::Sunday,
    ];

    pub fn from_date(date: NaiveDate) -> Self {
        Self::from(date.weekday())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClinicWeekday::Monday => "Monday",
            ClinicWeekday::Tuesday => "Tuesday",
            ClinicWeekday::Wednesday => "Wednesday",
            ClinicWeekday::Thursday => "Thursday",
            ClinicWeekday::Friday => "Friday",
            ClinicWeekday::Saturday => "Saturday",
            ClinicWeekday::Sunday => "Sunday",
        }
    }
}

impl From<Weekday> for ClinicWeekday {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => ClinicWeekday::Monday,
            Weekday::Tue => ClinicWeekday::Tuesday,
            Weekday::Wed => ClinicWeekday::Wednesday,
            Weekday::Thu => ClinicWeekday::Thursday,
            Weekday::Fri => ClinicWeekday::Friday,
            Weekday::Sat => ClinicWeekday::Saturday,
            Weekday::Sun => ClinicWeekday::Sunday,
        }
    }
}

impl fmt::Display for ClinicWeekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClinicWeekday {
    type Err = SchedulingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ClinicWeekday::ALL
            .iter()
            .copied()
            .find(|day| day.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SchedulingError::ValidationError(format!("Unknown weekday: {}", s)))
    }
}

// ==============================================================================
// STORED ROWS
// ==============================================================================

/// One bookable slot of a weekday schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotConfig {
    /// 12-hour wall time, e.g. "09:30 AM". Bookings reference it verbatim.
    pub time: String,
    #[serde(rename = "maxBookings")]
    pub max_bookings: u32,
}

/// A row of `working_hours` (clinic) or `mr_weekdays` (MR visits). The MR
/// table carries no hour ranges, so those columns default to `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingHour {
    pub day: ClinicWeekday,
    pub is_working: bool,
    #[serde(default)]
    pub morning_start: Option<String>,
    #[serde(default)]
    pub morning_end: Option<String>,
    #[serde(default)]
    pub evening_start: Option<String>,
    #[serde(default)]
    pub evening_end: Option<String>,
    #[serde(default)]
    pub slot_interval: Option<u32>,
    #[serde(default)]
    pub slots: Vec<SlotConfig>,
}

impl WorkingHour {
    pub fn find_slot(&self, time: &str) -> Option<&SlotConfig> {
        self.slots.iter().find(|slot| slot.time == time)
    }

    pub fn is_bookable(&self) -> bool {
        self.is_working && !self.slots.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosureDate {
    pub date: NaiveDate,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

// ==============================================================================
// RESULTS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosureStatus {
    pub is_closed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ClosureStatus {
    pub fn open() -> Self {
        Self { is_closed: false, reason: None }
    }

    pub fn closed(reason: Option<String>) -> Self {
        Self { is_closed: true, reason }
    }
}

/// A configured slot annotated with how many active bookings it holds.
/// Full slots are still listed so the UI can show them as unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableSlot {
    pub time: String,
    pub max_bookings: u32,
    pub current_bookings: u32,
}

impl AvailableSlot {
    pub fn is_full(&self) -> bool {
        self.current_bookings >= self.max_bookings
    }
}

// ==============================================================================
// REQUESTS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct SlotQuery {
    pub date: NaiveDate,
}

/// Admin edit of a clinic weekday; slots are regenerated from the hours.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateWorkingHoursRequest {
    pub is_working: bool,
    pub morning_start: Option<String>,
    pub morning_end: Option<String>,
    pub evening_start: Option<String>,
    pub evening_end: Option<String>,
    pub slot_interval: u32,
    pub max_bookings_per_slot: u32,
}

/// Admin replacement of a weekday's slot list, e.g. to change one slot's capacity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaceSlotsRequest {
    pub is_working: Option<bool>,
    pub slots: Vec<SlotConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateClosureRequest {
    pub start_date: NaiveDate,
    /// Inclusive; a single date when absent.
    pub end_date: Option<NaiveDate>,
    pub reason: Option<String>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum SchedulingError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid time: {0}")]
    InvalidTime(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
