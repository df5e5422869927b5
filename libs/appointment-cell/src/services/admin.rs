// libs/appointment-cell/src/services/admin.rs
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use scheduling_cell::services::time_format::to_24_hour;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Appointment, AppointmentError, AppointmentStatus};

/// Appointment management for the admin console. Calls carry the staff
/// member's session token.
pub struct AppointmentAdminService {
    supabase: Arc<SupabaseClient>,
}

impl AppointmentAdminService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    /// Appointments on `date` in slot order, optionally limited to one status.
    pub async fn list_by_date(
        &self,
        date: NaiveDate,
        status: Option<AppointmentStatus>,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let mut path = format!("/rest/v1/appointments?appointment_date=eq.{}", date);
        if let Some(status) = status {
            path.push_str(&format!("&status=eq.{}", status));
        }
        path.push_str("&order=created_at.asc");

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let mut appointments = parse_appointments(result)?;
        sort_by_slot_time(&mut appointments, |a| a.appointment_time.as_str());

        debug!("{} appointments on {}", appointments.len(), date);
        Ok(appointments)
    }

    pub async fn update_status(
        &self,
        appointment_id: Uuid,
        status: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);

        let result = self.supabase.request_returning(
            Method::PATCH,
            &path,
            Some(auth_token),
            json!({ "status": status }),
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let appointment = parse_appointments(result)?
            .into_iter()
            .next()
            .ok_or(AppointmentError::NotFound)?;

        info!("Appointment {} marked {}", appointment_id, status);
        Ok(appointment)
    }

    pub async fn delete(&self, appointment_id: Uuid, auth_token: &str) -> Result<(), AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);

        let deleted = self.supabase.delete_returning(&path, Some(auth_token))
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if deleted.is_empty() {
            return Err(AppointmentError::NotFound);
        }

        info!("Appointment {} deleted", appointment_id);
        Ok(())
    }
}

fn parse_appointments(rows: Vec<Value>) -> Result<Vec<Appointment>, AppointmentError> {
    rows.into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<Appointment>, _>>()
        .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointments: {}", e)))
}

/// Orders rows by the clock time of their 12-hour slot label. Labels that do
/// not parse go last; the sort is stable.
pub(crate) fn sort_by_slot_time<T>(rows: &mut [T], label: impl Fn(&T) -> &str) {
    rows.sort_by_key(|row| to_24_hour(label(row)).map_or((1, NaiveTime::MIN), |time| (0, time)));
}
