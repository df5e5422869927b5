// libs/appointment-cell/src/services/placement.rs
use std::sync::Arc;

use chrono::NaiveDate;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use patient_cell::{Patient, PatientDetails, PatientService};
use scheduling_cell::BookingChannel;
use shared_config::{AppConfig, BookingPolicy};
use shared_database::supabase::{filter_value, SupabaseClient};
use shared_utils::Clock;

use crate::models::{Appointment, AppointmentError, AppointmentStatus, BookingRejection, BookingRequest};
use crate::services::validator::BookingValidator;

#[derive(Debug, Deserialize)]
struct SlotHolder {
    id: Uuid,
}

/// Turns a validated booking request into a stored pending appointment.
pub struct BookingPlacementService {
    supabase: Arc<SupabaseClient>,
    validator: BookingValidator,
    patients: PatientService,
    confirm_placement: bool,
}

impl BookingPlacementService {
    pub fn new(config: &AppConfig, clock: Arc<dyn Clock>) -> Self {
        Self::with_client(Arc::new(SupabaseClient::new(config)), &config.booking, clock)
    }

    pub fn with_client(supabase: Arc<SupabaseClient>, policy: &BookingPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            validator: BookingValidator::with_client(Arc::clone(&supabase), policy, clock, BookingChannel::Clinic),
            patients: PatientService::with_client(Arc::clone(&supabase)),
            confirm_placement: policy.confirm_placement,
            supabase,
        }
    }

    pub fn validator(&self) -> &BookingValidator {
        &self.validator
    }

    /// Validates, links the patient record and inserts the appointment.
    ///
    /// `known_patient` is the record the booking form resolved from the phone
    /// number, if any. The patient write and the appointment insert are
    /// separate; a failure in between leaves the patient record behind.
    pub async fn place(
        &self,
        request: BookingRequest,
        known_patient: Option<Patient>,
    ) -> Result<Appointment, AppointmentError> {
        let name = request.name.trim().to_string();
        let phone = request.phone.trim().to_string();
        let age = request.check_patient_fields()?;

        let slot = self.validator.check(
            &name,
            &phone,
            request.appointment_date,
            request.appointment_time.as_deref(),
        ).await?;
        let date = request.appointment_date.ok_or(BookingRejection::MissingDate)?;

        let details = PatientDetails {
            name: name.clone(),
            age,
            city: request.city.trim().to_string(),
        };
        let patient = self.patients
            .upsert_for_booking(&phone, &details, known_patient, None)
            .await?;

        let appointment_data = json!({
            "name": name,
            "phone": phone,
            "age": age,
            "city": details.city,
            "appointment_date": date,
            "appointment_time": slot.time,
            "status": AppointmentStatus::Pending,
            "patient_id": patient.id,
        });

        let result = self.supabase.request_returning(
            Method::POST,
            "/rest/v1/appointments",
            None,
            appointment_data,
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let appointment: Appointment = result.into_iter()
            .next()
            .ok_or_else(|| AppointmentError::DatabaseError("Failed to create appointment".to_string()))
            .and_then(|row| serde_json::from_value(row)
                .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointment: {}", e))))?;

        if self.confirm_placement {
            self.confirm(&appointment, slot.max_bookings).await?;
        }

        info!(
            "Appointment {} booked for {} at {}",
            appointment.id, appointment.appointment_date, appointment.appointment_time
        );
        Ok(appointment)
    }

    /// Re-reads the slot and the patient's outstanding bookings after the
    /// insert. Earlier rows win: if the new row ranks past the slot capacity,
    /// or another outstanding booking of the same patient precedes it, the
    /// row is removed again and the booking is rejected.
    async fn confirm(&self, appointment: &Appointment, max_bookings: u32) -> Result<(), AppointmentError> {
        match slot_rank(
            &self.supabase,
            BookingChannel::Clinic,
            appointment.appointment_date,
            &appointment.appointment_time,
            appointment.id,
        ).await {
            Ok(Some(rank)) if rank > max_bookings as usize => {
                warn!(
                    "Appointment {} lost the race for {} {} (rank {} of {})",
                    appointment.id, appointment.appointment_date, appointment.appointment_time, rank, max_bookings
                );
                self.withdraw(appointment.id).await;
                return Err(BookingRejection::SlotFullyBooked.into());
            }
            Ok(_) => {}
            Err(e) => warn!("Could not confirm capacity for appointment {}: {}", appointment.id, e),
        }

        match self.validator.outstanding_bookings(&appointment.name, &appointment.phone).await {
            Ok(outstanding) => {
                if let Some(first) = outstanding.first().filter(|first| first.id != appointment.id) {
                    let date = first.appointment_date;
                    warn!("Appointment {} duplicates an outstanding booking on {}", appointment.id, date);
                    self.withdraw(appointment.id).await;
                    return Err(BookingRejection::DuplicateBooking { date }.into());
                }
            }
            Err(e) => warn!("Could not confirm uniqueness for appointment {}: {}", appointment.id, e),
        }

        debug!("Appointment {} confirmed", appointment.id);
        Ok(())
    }

    async fn withdraw(&self, appointment_id: Uuid) {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        if let Err(e) = self.supabase.delete_returning(&path, None).await {
            warn!("Failed to withdraw appointment {}: {}", appointment_id, e);
        }
    }
}

/// 1-based position of booking `id` among the rows holding the slot, in
/// insertion order. `None` when the row is not among them.
pub(crate) async fn slot_rank(
    supabase: &SupabaseClient,
    channel: BookingChannel,
    date: NaiveDate,
    time: &str,
    id: Uuid,
) -> Result<Option<usize>, AppointmentError> {
    let mut path = format!(
        "/rest/v1/{}?appointment_date=eq.{}&appointment_time=eq.{}",
        channel.bookings_table(),
        date,
        filter_value(time)
    );
    if channel.counts_pending_only() {
        path.push_str("&status=eq.pending");
    }
    path.push_str("&select=id&order=created_at.asc,id.asc");

    let result: Vec<Value> = supabase.request(
        Method::GET,
        &path,
        None,
        None,
    ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

    let holders = result.into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<SlotHolder>, _>>()
        .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse slot holders: {}", e)))?;

    Ok(holders.iter().position(|holder| holder.id == id).map(|index| index + 1))
}
