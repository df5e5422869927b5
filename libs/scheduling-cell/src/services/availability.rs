// libs/scheduling-cell/src/services/availability.rs
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, Timelike};
use tracing::{debug, error, warn};

use shared_config::{AppConfig, BookingPolicy};
use shared_database::supabase::SupabaseClient;
use shared_utils::{ClinicTime, Clock};

use crate::models::{AvailableSlot, BookingChannel, ClinicWeekday, SchedulingError};
use crate::services::booking_counts::BookingCountAggregator;
use crate::services::closure::ClosureDateChecker;
use crate::services::time_format::to_24_hour;
use crate::services::working_hours::WorkingHoursRepository;

/// Shown instead of slots when they could not be loaded.
pub const SLOT_LOAD_FAILED_NOTICE: &str = "Failed to load available time slots. Please try again.";

/// Turns a channel's weekday schedule into the bookable slots of one date.
pub struct SlotAvailabilityEngine {
    closures: ClosureDateChecker,
    working_hours: WorkingHoursRepository,
    booking_counts: BookingCountAggregator,
    policy: BookingPolicy,
    clinic_time: ClinicTime,
    clock: Arc<dyn Clock>,
    channel: BookingChannel,
}

impl SlotAvailabilityEngine {
    pub fn new(config: &AppConfig, clock: Arc<dyn Clock>, channel: BookingChannel) -> Self {
        Self::with_client(Arc::new(SupabaseClient::new(config)), config.booking.clone(), clock, channel)
    }

    pub fn with_client(
        supabase: Arc<SupabaseClient>,
        policy: BookingPolicy,
        clock: Arc<dyn Clock>,
        channel: BookingChannel,
    ) -> Self {
        Self {
            closures: ClosureDateChecker::new(Arc::clone(&supabase), channel, policy.closure_check_policy),
            working_hours: WorkingHoursRepository::new(Arc::clone(&supabase), channel),
            booking_counts: BookingCountAggregator::new(supabase, channel),
            clinic_time: ClinicTime::from_policy(&policy),
            policy,
            clock,
            channel,
        }
    }

    /// Slots for `date`, or an empty list when they cannot be loaded after
    /// the configured number of attempts.
    pub async fn get_available_slots(&self, date: NaiveDate) -> Vec<AvailableSlot> {
        match self.load_available_slots(date).await {
            Ok(slots) => slots,
            Err(e) => {
                error!("Giving up on {} slots for {}: {}", self.channel, date, e);
                vec![]
            }
        }
    }

    /// Like `get_available_slots`, but reports the final error once retries
    /// are exhausted so callers can tell "no slots" from "failed to load".
    pub async fn load_available_slots(&self, date: NaiveDate) -> Result<Vec<AvailableSlot>, SchedulingError> {
        let attempts = self.policy.slot_load_max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.compute_slots(date).await {
                Ok(slots) => return Ok(slots),
                Err(e) if attempt < attempts => {
                    warn!(
                        "Loading {} slots for {} failed (attempt {}/{}): {}",
                        self.channel, date, attempt, attempts, e
                    );
                    tokio::time::sleep(self.policy.slot_load_retry_delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn compute_slots(&self, date: NaiveDate) -> Result<Vec<AvailableSlot>, SchedulingError> {
        debug!("Calculating {} slots for {}", self.channel, date);

        if self.closures.is_closed(date).await.is_closed {
            return Ok(vec![]);
        }

        let weekday = ClinicWeekday::from_date(date);
        let schedule = match self.working_hours.get_for_weekday(weekday).await? {
            Some(schedule) if schedule.is_bookable() => schedule,
            _ => {
                debug!("No {} slots configured for {}", self.channel, weekday);
                return Ok(vec![]);
            }
        };

        let counts = self.booking_counts.count_by_time_slot(date).await?;

        let slots: Vec<AvailableSlot> = schedule.slots
            .into_iter()
            .map(|slot| AvailableSlot {
                current_bookings: counts.get(&slot.time).copied().unwrap_or(0),
                time: slot.time,
                max_bookings: slot.max_bookings,
            })
            .collect();

        let now = self.clinic_time.now_local(self.clock.as_ref());
        if date != now.date_naive() {
            return Ok(slots);
        }

        Ok(apply_same_day_cutoff(slots, date, now, &self.policy, &self.clinic_time))
    }
}

/// Filters today's slots. A slot survives only if it has not started yet,
/// the morning block is still open (or the slot is past the morning), and the
/// day's booking cutoff has not been reached. Order is preserved.
pub fn apply_same_day_cutoff(
    slots: Vec<AvailableSlot>,
    date: NaiveDate,
    now: DateTime<FixedOffset>,
    policy: &BookingPolicy,
    clinic_time: &ClinicTime,
) -> Vec<AvailableSlot> {
    let hour_now = now.hour();
    if hour_now >= policy.day_cutoff_hour {
        return vec![];
    }
    let morning_closed = hour_now >= policy.morning_cutoff_hour;

    slots.into_iter()
        .filter(|slot| {
            let start = match to_24_hour(&slot.time) {
                Ok(start) => start,
                Err(_) => {
                    warn!("Dropping slot with unreadable time {:?}", slot.time);
                    return false;
                }
            };

            let already_started = clinic_time
                .instant_of(date, start)
                .map_or(true, |instant| instant < now);
            if already_started {
                return false;
            }

            !(morning_closed && start.hour() <= policy.morning_block_last_hour)
        })
        .collect()
}
