use std::sync::Arc;

use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{filter_value, SupabaseClient};

use crate::models::{is_valid_phone, split_name, Patient, PatientDetails, PatientError};

pub struct PatientService {
    supabase: Arc<SupabaseClient>,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_client(Arc::new(SupabaseClient::new(config)))
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Exact match on the phone number.
    pub async fn find_by_phone(
        &self,
        phone: &str,
        auth_token: Option<&str>,
    ) -> Result<Option<Patient>, PatientError> {
        if !is_valid_phone(phone) {
            return Err(PatientError::ValidationError(
                "Phone number must be exactly 10 digits".to_string(),
            ));
        }

        debug!("Looking up patient by phone");

        let path = format!("/rest/v1/patients?phone_number=eq.{}&limit=1", filter_value(phone));
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            auth_token,
            None,
        ).await.map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        result.into_iter()
            .next()
            .map(serde_json::from_value::<Patient>)
            .transpose()
            .map_err(|e| PatientError::DatabaseError(format!("Failed to parse patient: {}", e)))
    }

    pub async fn create_patient(
        &self,
        phone: &str,
        details: &PatientDetails,
        auth_token: Option<&str>,
    ) -> Result<Patient, PatientError> {
        let (first_name, last_name) = split_name(&details.name);
        let patient_data = json!({
            "phone_number": phone,
            "first_name": first_name,
            "last_name": last_name,
            "age": details.age,
            "address": details.city.trim(),
        });

        let result = self.supabase.request_returning(
            Method::POST,
            "/rest/v1/patients",
            auth_token,
            patient_data,
        ).await.map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        let patient = first_patient(result, PatientError::DatabaseError("Failed to create patient".to_string()))?;
        info!("Patient {} created", patient.id);
        Ok(patient)
    }

    pub async fn update_details(
        &self,
        patient_id: Uuid,
        details: &PatientDetails,
        auth_token: Option<&str>,
    ) -> Result<Patient, PatientError> {
        let (first_name, last_name) = split_name(&details.name);
        let update_data = json!({
            "first_name": first_name,
            "last_name": last_name,
            "age": details.age,
            "address": details.city.trim(),
        });

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let result = self.supabase.request_returning(
            Method::PATCH,
            &path,
            auth_token,
            update_data,
        ).await.map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        let patient = first_patient(result, PatientError::NotFound)?;
        info!("Patient {} updated", patient.id);
        Ok(patient)
    }

    /// Patient record to link a booking to. The record matching the phone is
    /// updated only when the booking's name, age or city differ from it; a
    /// phone with no record gets a new one.
    pub async fn upsert_for_booking(
        &self,
        phone: &str,
        details: &PatientDetails,
        known: Option<Patient>,
        auth_token: Option<&str>,
    ) -> Result<Patient, PatientError> {
        let existing = match known.filter(|patient| patient.phone_number == phone) {
            Some(patient) => Some(patient),
            None => self.find_by_phone(phone, auth_token).await?,
        };

        match existing {
            Some(patient) if patient.differs_from(details) => {
                self.update_details(patient.id, details, auth_token).await
            }
            Some(patient) => {
                debug!("Patient {} unchanged", patient.id);
                Ok(patient)
            }
            None => self.create_patient(phone, details, auth_token).await,
        }
    }
}

fn first_patient(rows: Vec<Value>, missing: PatientError) -> Result<Patient, PatientError> {
    let row = rows.into_iter().next().ok_or(missing)?;

    serde_json::from_value(row)
        .map_err(|e| PatientError::DatabaseError(format!("Failed to parse patient: {}", e)))
}
