// libs/scheduling-cell/src/services/working_hours.rs
use std::collections::HashSet;
use std::sync::Arc;

use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};

use shared_database::supabase::SupabaseClient;

use crate::models::{
    BookingChannel, ClinicWeekday, ReplaceSlotsRequest, SchedulingError, SlotConfig,
    UpdateWorkingHoursRequest, WorkingHour,
};
use crate::services::time_format::{generate_slots, parse_range, to_24_hour};

/// Weekday schedules of a channel (`working_hours` or `mr_weekdays`).
pub struct WorkingHoursRepository {
    supabase: Arc<SupabaseClient>,
    channel: BookingChannel,
}

impl WorkingHoursRepository {
    pub fn new(supabase: Arc<SupabaseClient>, channel: BookingChannel) -> Self {
        Self { supabase, channel }
    }

    pub async fn get_for_weekday(&self, day: ClinicWeekday) -> Result<Option<WorkingHour>, SchedulingError> {
        debug!("Fetching {} schedule for {}", self.channel, day);

        let path = format!(
            "/rest/v1/{}?day=eq.{}&limit=1",
            self.channel.schedule_table(),
            day
        );

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            None,
            None,
        ).await.map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        result.into_iter()
            .next()
            .map(serde_json::from_value::<WorkingHour>)
            .transpose()
            .map_err(|e| SchedulingError::DatabaseError(format!("Failed to parse schedule for {}: {}", day, e)))
    }

    /// All configured weekdays, Monday first.
    pub async fn list(&self, auth_token: Option<&str>) -> Result<Vec<WorkingHour>, SchedulingError> {
        let path = format!("/rest/v1/{}", self.channel.schedule_table());

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            auth_token,
            None,
        ).await.map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        let mut schedules = result.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<WorkingHour>, _>>()
            .map_err(|e| SchedulingError::DatabaseError(format!("Failed to parse schedules: {}", e)))?;

        schedules.sort_by_key(|schedule| schedule.day as u8);
        Ok(schedules)
    }

    /// Saves new hours for a clinic weekday and regenerates its slots from them.
    pub async fn update_working_hours(
        &self,
        day: ClinicWeekday,
        request: UpdateWorkingHoursRequest,
        auth_token: Option<&str>,
    ) -> Result<WorkingHour, SchedulingError> {
        if self.channel != BookingChannel::Clinic {
            return Err(SchedulingError::ValidationError(
                "Hour ranges are only configured for clinic working hours".to_string(),
            ));
        }

        let morning = parse_range(request.morning_start.as_deref(), request.morning_end.as_deref(), "Morning")?;
        let evening = parse_range(request.evening_start.as_deref(), request.evening_end.as_deref(), "Evening")?;
        let ranges: Vec<_> = morning.into_iter().chain(evening).collect();

        if request.is_working && ranges.is_empty() {
            return Err(SchedulingError::ValidationError(
                "A working day needs morning or evening hours".to_string(),
            ));
        }

        let slots = generate_slots(&ranges, request.slot_interval, request.max_bookings_per_slot)?;
        debug!("Generated {} slots for {}", slots.len(), day);

        let update = json!({
            "is_working": request.is_working,
            "morning_start": request.morning_start,
            "morning_end": request.morning_end,
            "evening_start": request.evening_start,
            "evening_end": request.evening_end,
            "slot_interval": request.slot_interval,
            "slots": slots,
        });

        let updated = self.patch_day(day, update, auth_token).await?;
        info!("Working hours for {} updated ({} slots)", day, updated.slots.len());
        Ok(updated)
    }

    /// Replaces a weekday's slot list as given, keeping its order.
    pub async fn replace_slots(
        &self,
        day: ClinicWeekday,
        request: ReplaceSlotsRequest,
        auth_token: Option<&str>,
    ) -> Result<WorkingHour, SchedulingError> {
        validate_slot_list(&request.slots)?;

        let mut update = serde_json::Map::new();
        update.insert("slots".to_string(), json!(request.slots));
        if let Some(is_working) = request.is_working {
            update.insert("is_working".to_string(), json!(is_working));
        }

        let updated = self.patch_day(day, Value::Object(update), auth_token).await?;
        info!("{} slots for {} replaced ({} slots)", self.channel, day, updated.slots.len());
        Ok(updated)
    }

    async fn patch_day(
        &self,
        day: ClinicWeekday,
        update: Value,
        auth_token: Option<&str>,
    ) -> Result<WorkingHour, SchedulingError> {
        let path = format!("/rest/v1/{}?day=eq.{}", self.channel.schedule_table(), day);

        let result = self.supabase.request_returning(
            Method::PATCH,
            &path,
            auth_token,
            update,
        ).await.map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        let row = result.into_iter()
            .next()
            .ok_or_else(|| SchedulingError::NotFound(format!("Schedule for {}", day)))?;

        serde_json::from_value(row)
            .map_err(|e| SchedulingError::DatabaseError(format!("Failed to parse schedule for {}: {}", day, e)))
    }
}

/// Every label must parse, be unique and allow at least one booking.
pub fn validate_slot_list(slots: &[SlotConfig]) -> Result<(), SchedulingError> {
    let mut seen = HashSet::new();

    for slot in slots {
        to_24_hour(&slot.time)?;
        if slot.max_bookings == 0 {
            return Err(SchedulingError::ValidationError(format!(
                "Slot {} must allow at least one booking",
                slot.time
            )));
        }
        if !seen.insert(slot.time.as_str()) {
            return Err(SchedulingError::ValidationError(format!("Duplicate slot {}", slot.time)));
        }
    }

    Ok(())
}
