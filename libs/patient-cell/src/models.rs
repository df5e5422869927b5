use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub phone_number: String,
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub age: Option<u32>,
    /// The city given on the booking form.
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    /// True when any of name, age or city on the booking form disagrees with
    /// the stored record.
    pub fn differs_from(&self, details: &PatientDetails) -> bool {
        let (first_name, last_name) = split_name(&details.name);

        self.first_name != first_name
            || self.last_name != last_name
            || self.age != Some(details.age)
            || self.address.as_deref().unwrap_or_default() != details.city.trim()
    }

    pub fn autofill(&self) -> PatientAutofill {
        PatientAutofill {
            patient_id: self.id,
            name: self.full_name(),
            age: self.age,
            city: self.address.clone(),
        }
    }
}

/// Identity fields a booking carries for its patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientDetails {
    pub name: String,
    pub age: u32,
    pub city: String,
}

/// What the booking form pre-fills once a phone number matches a patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientAutofill {
    pub patient_id: Uuid,
    pub name: String,
    pub age: Option<u32>,
    pub city: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatientLookupQuery {
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum PatientError {
    #[error("Patient not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Splits a full name at the first whitespace: "Asha Rani Patel" becomes
/// ("Asha", "Rani Patel").
pub fn split_name(name: &str) -> (String, String) {
    let name = name.trim();
    match name.split_once(char::is_whitespace) {
        Some((first, rest)) => (first.to_string(), rest.trim().to_string()),
        None => (name.to_string(), String::new()),
    }
}

// ASCII digits only: `\d` would also accept other scripts' digits.
static PHONE_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^[0-9]{10}$").ok());

/// Phone numbers are exactly ten ASCII digits.
pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(phone))
}
