// libs/scheduling-cell/src/services/time_format.rs
//! Conversion between the 12-hour slot labels stored in the schedule tables
//! ("09:30 AM") and `NaiveTime`, plus slot generation from hour ranges.

use chrono::{Duration, NaiveTime};

use crate::models::{SchedulingError, SlotConfig};

const TWELVE_HOUR_FORMAT: &str = "%I:%M %p";

pub const ALLOWED_SLOT_INTERVALS: [u32; 2] = [15, 30];

/// Parses a 12-hour label such as "09:30 AM" or "5:00 pm".
pub fn to_24_hour(label: &str) -> Result<NaiveTime, SchedulingError> {
    let normalized = label.trim().to_ascii_uppercase();
    NaiveTime::parse_from_str(&normalized, TWELVE_HOUR_FORMAT)
        .map_err(|_| SchedulingError::InvalidTime(label.to_string()))
}

/// Formats a time as a zero-padded 12-hour label, e.g. "05:00 PM".
pub fn to_12_hour(time: NaiveTime) -> String {
    time.format(TWELVE_HOUR_FORMAT).to_string()
}

/// Builds the slot list for the given ranges: each range yields a slot every
/// `interval_minutes` from its start (inclusive) up to its end (exclusive).
pub fn generate_slots(
    ranges: &[(NaiveTime, NaiveTime)],
    interval_minutes: u32,
    max_bookings: u32,
) -> Result<Vec<SlotConfig>, SchedulingError> {
    if !ALLOWED_SLOT_INTERVALS.contains(&interval_minutes) {
        return Err(SchedulingError::ValidationError(format!(
            "Slot interval must be 15 or 30 minutes, got {}",
            interval_minutes
        )));
    }
    if max_bookings == 0 {
        return Err(SchedulingError::ValidationError(
            "Each slot must allow at least one booking".to_string(),
        ));
    }

    let step = Duration::minutes(interval_minutes as i64);
    let mut slots = Vec::new();

    for &(start, end) in ranges {
        if start >= end {
            return Err(SchedulingError::ValidationError(format!(
                "Start time {} must be before end time {}",
                to_12_hour(start),
                to_12_hour(end)
            )));
        }

        let mut current = start;
        while current < end {
            slots.push(SlotConfig {
                time: to_12_hour(current),
                max_bookings,
            });

            let (next, wrapped) = current.overflowing_add_signed(step);
            if wrapped != 0 {
                break;
            }
            current = next;
        }
    }

    Ok(slots)
}

/// Resolves an optional start/end pair of labels. Both or neither must be set.
pub fn parse_range(
    start: Option<&str>,
    end: Option<&str>,
    label: &str,
) -> Result<Option<(NaiveTime, NaiveTime)>, SchedulingError> {
    match (start, end) {
        (None, None) => Ok(None),
        (Some(start), Some(end)) => Ok(Some((to_24_hour(start)?, to_24_hour(end)?))),
        _ => Err(SchedulingError::ValidationError(format!(
            "{} hours need both a start and an end time",
            label
        ))),
    }
}
