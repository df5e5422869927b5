// libs/appointment-cell/src/services/validator.rs
use std::sync::Arc;

use chrono::NaiveDate;
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error};
use uuid::Uuid;

use patient_cell::is_valid_phone;
use scheduling_cell::{
    BookingChannel, BookingCountAggregator, ClinicWeekday, ClosureDateChecker, SlotConfig,
    WorkingHoursRepository,
};
use shared_config::{AppConfig, BookingPolicy};
use shared_database::supabase::{filter_value, SupabaseClient};
use shared_utils::{ClinicTime, Clock};

use crate::models::{AppointmentError, BookingRejection, BookingValidation};

/// An appointment still ahead of the patient, oldest booking first.
#[derive(Debug, Clone, Deserialize)]
pub struct OutstandingBooking {
    pub id: Uuid,
    pub appointment_date: NaiveDate,
}

/// Read-only booking checks for one channel. Runs the checks in a fixed
/// order and stops at the first that fails.
pub struct BookingValidator {
    supabase: Arc<SupabaseClient>,
    closures: ClosureDateChecker,
    working_hours: WorkingHoursRepository,
    booking_counts: BookingCountAggregator,
    clinic_time: ClinicTime,
    clock: Arc<dyn Clock>,
    channel: BookingChannel,
}

impl BookingValidator {
    pub fn new(config: &AppConfig, clock: Arc<dyn Clock>, channel: BookingChannel) -> Self {
        Self::with_client(Arc::new(SupabaseClient::new(config)), &config.booking, clock, channel)
    }

    pub fn with_client(
        supabase: Arc<SupabaseClient>,
        policy: &BookingPolicy,
        clock: Arc<dyn Clock>,
        channel: BookingChannel,
    ) -> Self {
        Self {
            closures: ClosureDateChecker::new(Arc::clone(&supabase), channel, policy.closure_check_policy),
            working_hours: WorkingHoursRepository::new(Arc::clone(&supabase), channel),
            booking_counts: BookingCountAggregator::new(Arc::clone(&supabase), channel),
            clinic_time: ClinicTime::from_policy(policy),
            supabase,
            clock,
            channel,
        }
    }

    pub fn channel(&self) -> BookingChannel {
        self.channel
    }

    /// Checks whether `name`/`phone` may book `time_slot` on `date`.
    /// Backend failures are logged and reported as a generic retry-later
    /// message.
    pub async fn validate(
        &self,
        name: &str,
        phone: &str,
        date: Option<NaiveDate>,
        time_slot: Option<&str>,
    ) -> BookingValidation {
        match self.check(name, phone, date, time_slot).await {
            Ok(_) => BookingValidation::valid(),
            Err(AppointmentError::Rejected(rejection)) => {
                debug!("{} booking rejected: {}", self.channel, rejection);
                BookingValidation::rejected(&rejection)
            }
            Err(e) => {
                error!("Error validating {} booking: {}", self.channel, e);
                BookingValidation::rejected(&BookingRejection::Unexpected)
            }
        }
    }

    /// Same checks as `validate`, returning the configured slot on success so
    /// placement knows its capacity.
    pub async fn check(
        &self,
        name: &str,
        phone: &str,
        date: Option<NaiveDate>,
        time_slot: Option<&str>,
    ) -> Result<SlotConfig, AppointmentError> {
        let date = date.ok_or(BookingRejection::MissingDate)?;
        let time_slot = time_slot
            .map(str::trim)
            .filter(|slot| !slot.is_empty())
            .ok_or(BookingRejection::MissingTimeSlot)?;

        if !is_valid_phone(phone) {
            return Err(BookingRejection::InvalidPhone.into());
        }

        if date < self.clinic_time.today(self.clock.as_ref()) {
            return Err(BookingRejection::PastDate.into());
        }

        let closure = self.closures.is_closed(date).await;
        if closure.is_closed {
            return Err(self.closed_rejection(closure.reason).into());
        }

        let weekday = ClinicWeekday::from_date(date);
        let schedule = match self.working_hours.get_for_weekday(weekday).await? {
            Some(schedule) if schedule.is_bookable() => schedule,
            _ => return Err(BookingRejection::ClosedOnWeekday.into()),
        };

        let slot = schedule
            .find_slot(time_slot)
            .cloned()
            .ok_or(BookingRejection::InvalidTimeSlot)?;

        let booked = self.booking_counts.count_for_slot(date, &slot.time).await?;
        if booked >= slot.max_bookings {
            return Err(BookingRejection::SlotFullyBooked.into());
        }

        if self.channel == BookingChannel::Clinic {
            if let Some(existing) = self.outstanding_bookings(name, phone).await?.first() {
                return Err(BookingRejection::DuplicateBooking { date: existing.appointment_date }.into());
            }
        }

        Ok(slot)
    }

    /// Pending bookings for this identity dated today or later. Completed
    /// and cancelled appointments never block a new booking.
    pub async fn outstanding_bookings(
        &self,
        name: &str,
        phone: &str,
    ) -> Result<Vec<OutstandingBooking>, AppointmentError> {
        let today = self.clinic_time.today(self.clock.as_ref());
        let path = format!(
            "/rest/v1/appointments?name=eq.{}&phone=eq.{}&appointment_date=gte.{}&status=eq.pending&select=id,appointment_date&order=created_at.asc,id.asc",
            filter_value(name.trim()),
            filter_value(phone),
            today
        );

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            None,
            None,
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        result.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<OutstandingBooking>, _>>()
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointments: {}", e)))
    }

    fn closed_rejection(&self, reason: Option<String>) -> BookingRejection {
        match self.channel {
            BookingChannel::Clinic => BookingRejection::ClinicClosed { reason },
            BookingChannel::MedicalRepresentative => BookingRejection::MrVisitsClosed { reason },
        }
    }
}
