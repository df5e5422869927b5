// libs/appointment-cell/src/services/mr.rs
use std::sync::Arc;

use chrono::NaiveDate;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use scheduling_cell::BookingChannel;
use shared_config::{AppConfig, BookingPolicy};
use shared_database::supabase::SupabaseClient;
use shared_utils::Clock;

use crate::models::{AppointmentError, BookingRejection, BookingValidation, MrAppointment, MrBookingRequest};
use crate::services::admin::sort_by_slot_time;
use crate::services::placement::slot_rank;
use crate::services::validator::BookingValidator;

/// Medical representative visits: same slot rules as patients, separate
/// tables, no status lifecycle and no one-booking-per-person rule.
pub struct MrAppointmentService {
    supabase: Arc<SupabaseClient>,
    validator: BookingValidator,
    confirm_placement: bool,
}

impl MrAppointmentService {
    pub fn new(config: &AppConfig, clock: Arc<dyn Clock>) -> Self {
        Self::with_client(Arc::new(SupabaseClient::new(config)), &config.booking, clock)
    }

    pub fn with_client(supabase: Arc<SupabaseClient>, policy: &BookingPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            validator: BookingValidator::with_client(
                Arc::clone(&supabase),
                policy,
                clock,
                BookingChannel::MedicalRepresentative,
            ),
            confirm_placement: policy.confirm_placement,
            supabase,
        }
    }

    pub async fn validate(&self, request: &MrBookingRequest) -> BookingValidation {
        if let Err(rejection) = check_visitor_fields(request) {
            return BookingValidation::rejected(&rejection);
        }

        self.validator.validate(
            request.mr_name.trim(),
            request.contact_no.trim(),
            request.appointment_date,
            request.appointment_time.as_deref(),
        ).await
    }

    pub async fn book(&self, request: MrBookingRequest) -> Result<MrAppointment, AppointmentError> {
        check_visitor_fields(&request)?;

        let contact_no = request.contact_no.trim().to_string();
        let slot = self.validator.check(
            request.mr_name.trim(),
            &contact_no,
            request.appointment_date,
            request.appointment_time.as_deref(),
        ).await?;
        let date = request.appointment_date.ok_or(BookingRejection::MissingDate)?;

        let visit_data = json!({
            "mr_name": request.mr_name.trim(),
            "company_name": request.company_name.trim(),
            "division_name": request.division_name.as_deref().map(str::trim).filter(|d| !d.is_empty()),
            "contact_no": contact_no,
            "appointment_date": date,
            "appointment_time": slot.time,
        });

        let result = self.supabase.request_returning(
            Method::POST,
            "/rest/v1/mr_appointments",
            None,
            visit_data,
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let visit = parse_visits(result)?
            .into_iter()
            .next()
            .ok_or_else(|| AppointmentError::DatabaseError("Failed to create MR appointment".to_string()))?;

        if self.confirm_placement {
            self.confirm(&visit, slot.max_bookings).await?;
        }

        info!("MR visit {} booked for {} at {}", visit.id, visit.appointment_date, visit.appointment_time);
        Ok(visit)
    }

    pub async fn list_by_date(&self, date: NaiveDate, auth_token: &str) -> Result<Vec<MrAppointment>, AppointmentError> {
        let path = format!("/rest/v1/mr_appointments?appointment_date=eq.{}&order=created_at.asc", date);

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let mut visits = parse_visits(result)?;
        sort_by_slot_time(&mut visits, |v| v.appointment_time.as_str());
        Ok(visits)
    }

    pub async fn delete(&self, visit_id: Uuid, auth_token: &str) -> Result<(), AppointmentError> {
        let path = format!("/rest/v1/mr_appointments?id=eq.{}", visit_id);

        let deleted = self.supabase.delete_returning(&path, Some(auth_token))
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if deleted.is_empty() {
            return Err(AppointmentError::NotFound);
        }

        info!("MR visit {} deleted", visit_id);
        Ok(())
    }

    async fn confirm(&self, visit: &MrAppointment, max_bookings: u32) -> Result<(), AppointmentError> {
        let rank = slot_rank(
            &self.supabase,
            BookingChannel::MedicalRepresentative,
            visit.appointment_date,
            &visit.appointment_time,
            visit.id,
        ).await;

        match rank {
            Ok(Some(rank)) if rank > max_bookings as usize => {
                warn!("MR visit {} lost the race for its slot (rank {} of {})", visit.id, rank, max_bookings);
                let path = format!("/rest/v1/mr_appointments?id=eq.{}", visit.id);
                if let Err(e) = self.supabase.delete_returning(&path, None).await {
                    warn!("Failed to withdraw MR visit {}: {}", visit.id, e);
                }
                Err(BookingRejection::SlotFullyBooked.into())
            }
            Ok(_) => Ok(()),
            Err(e) => {
                warn!("Could not confirm capacity for MR visit {}: {}", visit.id, e);
                Ok(())
            }
        }
    }
}

fn check_visitor_fields(request: &MrBookingRequest) -> Result<(), BookingRejection> {
    if request.mr_name.trim().is_empty() {
        return Err(BookingRejection::MissingName);
    }
    if request.company_name.trim().is_empty() {
        return Err(BookingRejection::MissingCompany);
    }
    Ok(())
}

fn parse_visits(rows: Vec<Value>) -> Result<Vec<MrAppointment>, AppointmentError> {
    rows.into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<MrAppointment>, _>>()
        .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse MR appointments: {}", e)))
}
