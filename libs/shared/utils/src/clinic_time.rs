//! Civil time at the clinic. All "today" and "now" decisions are made in the
//! clinic's fixed offset, never in the host's local zone.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Timelike, Utc};
use tracing::warn;

use shared_config::BookingPolicy;

use crate::clock::Clock;

const IST_OFFSET_SECONDS: i32 = 5 * 3600 + 30 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClinicTime {
    offset: FixedOffset,
}

impl Default for ClinicTime {
    fn default() -> Self {
        Self::ist()
    }
}

impl ClinicTime {
    pub fn ist() -> Self {
        Self::from_offset_seconds(IST_OFFSET_SECONDS)
    }

    pub fn from_policy(policy: &BookingPolicy) -> Self {
        Self::from_offset_seconds(policy.clinic_utc_offset_minutes * 60)
    }

    fn from_offset_seconds(seconds: i32) -> Self {
        let offset = FixedOffset::east_opt(seconds)
            .or_else(|| {
                warn!("Clinic UTC offset of {}s is out of range, using +05:30", seconds);
                FixedOffset::east_opt(IST_OFFSET_SECONDS)
            })
            .unwrap_or_else(|| Utc.fix());
        Self { offset }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn to_local(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        instant.with_timezone(&self.offset)
    }

    pub fn now_local(&self, clock: &dyn Clock) -> DateTime<FixedOffset> {
        self.to_local(clock.now())
    }

    pub fn today(&self, clock: &dyn Clock) -> NaiveDate {
        self.now_local(clock).date_naive()
    }

    pub fn hour_now(&self, clock: &dyn Clock) -> u32 {
        self.now_local(clock).hour()
    }

    /// The instant at which `time` on `date` occurs at the clinic.
    pub fn instant_of(&self, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Utc>> {
        self.offset
            .from_local_datetime(&date.and_time(time))
            .single()
            .map(|local| local.with_timezone(&Utc))
    }
}
