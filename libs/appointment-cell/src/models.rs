// libs/appointment-cell/src/models.rs
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use patient_cell::PatientError;
use scheduling_cell::SchedulingError;

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Completed,
    Cancelled,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for AppointmentStatus {
    type Err = AppointmentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(AppointmentStatus::Pending),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            other => Err(AppointmentError::ValidationError(format!("Unknown status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub age: u32,
    pub city: String,
    pub appointment_date: NaiveDate,
    pub appointment_time: String,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub patient_id: Option<Uuid>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A patient booking as submitted by the booking form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookingRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub appointment_date: Option<NaiveDate>,
    #[serde(default)]
    pub appointment_time: Option<String>,
}

impl BookingRequest {
    /// Form fields the validator does not look at but an appointment row needs.
    pub fn check_patient_fields(&self) -> Result<u32, BookingRejection> {
        if self.name.trim().is_empty() {
            return Err(BookingRejection::MissingName);
        }
        let age = match self.age {
            Some(age) if (1..=MAX_PATIENT_AGE).contains(&age) => age,
            _ => return Err(BookingRejection::InvalidAge),
        };
        if self.city.trim().is_empty() {
            return Err(BookingRejection::MissingCity);
        }
        Ok(age)
    }
}

pub const MAX_PATIENT_AGE: u32 = 120;

#[derive(Debug, Clone, Deserialize)]
pub struct AppointmentListQuery {
    pub date: NaiveDate,
    pub status: Option<AppointmentStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
}

// ==============================================================================
// MEDICAL REPRESENTATIVE VISITS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MrAppointment {
    pub id: Uuid,
    pub mr_name: String,
    pub company_name: String,
    #[serde(default)]
    pub division_name: Option<String>,
    pub contact_no: String,
    pub appointment_date: NaiveDate,
    pub appointment_time: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MrBookingRequest {
    #[serde(default)]
    pub mr_name: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub division_name: Option<String>,
    #[serde(default)]
    pub contact_no: String,
    #[serde(default)]
    pub appointment_date: Option<NaiveDate>,
    #[serde(default)]
    pub appointment_time: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MrAppointmentListQuery {
    pub date: NaiveDate,
}

// ==============================================================================
// VALIDATION OUTCOMES
// ==============================================================================

/// Result of a booking check. Never an error: a failed check carries the
/// message to show the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingValidation {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BookingValidation {
    pub fn valid() -> Self {
        Self { is_valid: true, error: None }
    }

    pub fn rejected(rejection: &BookingRejection) -> Self {
        Self { is_valid: false, error: Some(rejection.to_string()) }
    }
}

/// Expected reasons a booking is refused. The display text is shown to the
/// user as is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookingRejection {
    #[error("Please select an appointment date")]
    MissingDate,

    #[error("Please select a time slot")]
    MissingTimeSlot,

    #[error("Please enter a valid 10-digit phone number")]
    InvalidPhone,

    #[error("Please select a date that is not in the past")]
    PastDate,

    #[error("Please enter your name")]
    MissingName,

    #[error("Please enter a valid age")]
    InvalidAge,

    #[error("Please enter your city")]
    MissingCity,

    #[error("Please enter the company name")]
    MissingCompany,

    #[error("{}", closed_message("The clinic is closed on this date", .reason))]
    ClinicClosed { reason: Option<String> },

    #[error("{}", closed_message("MR visits are not available on this date", .reason))]
    MrVisitsClosed { reason: Option<String> },

    #[error("The clinic is closed on this day")]
    ClosedOnWeekday,

    #[error("Invalid time slot selected")]
    InvalidTimeSlot,

    #[error("This time slot is fully booked. Please select another time.")]
    SlotFullyBooked,

    #[error("You already have an upcoming appointment on {date}. You can book a new appointment after that date has passed.")]
    DuplicateBooking { date: NaiveDate },

    #[error("An unexpected error occurred. Please try again later")]
    Unexpected,
}

fn closed_message(base: &str, reason: &Option<String>) -> String {
    match reason.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        Some(reason) => format!("{}: {}", base, reason),
        None => base.to_string(),
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error(transparent)]
    Rejected(#[from] BookingRejection),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl AppointmentError {
    /// Text for the booking form's error notice.
    pub fn user_message(&self) -> String {
        match self {
            AppointmentError::Rejected(rejection) => rejection.to_string(),
            AppointmentError::ValidationError(msg) => msg.clone(),
            AppointmentError::NotFound => self.to_string(),
            AppointmentError::DatabaseError(_) => BookingRejection::Unexpected.to_string(),
        }
    }
}

impl From<SchedulingError> for AppointmentError {
    fn from(error: SchedulingError) -> Self {
        match error {
            SchedulingError::InvalidTime(_) | SchedulingError::ValidationError(_) => {
                AppointmentError::ValidationError(error.to_string())
            }
            SchedulingError::NotFound(_) | SchedulingError::DatabaseError(_) => {
                AppointmentError::DatabaseError(error.to_string())
            }
        }
    }
}

impl From<PatientError> for AppointmentError {
    fn from(error: PatientError) -> Self {
        match error {
            PatientError::ValidationError(msg) => AppointmentError::ValidationError(msg),
            PatientError::NotFound | PatientError::DatabaseError(_) => {
                AppointmentError::DatabaseError(error.to_string())
            }
        }
    }
}
