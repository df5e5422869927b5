// libs/scheduling-cell/src/services/booking_counts.rs
use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use shared_database::supabase::{filter_value, SupabaseClient};

use crate::models::{BookingChannel, SchedulingError};

#[derive(Debug, Deserialize)]
struct BookedTime {
    appointment_time: String,
}

/// Counts active bookings per slot label for a date.
pub struct BookingCountAggregator {
    supabase: Arc<SupabaseClient>,
    channel: BookingChannel,
}

impl BookingCountAggregator {
    pub fn new(supabase: Arc<SupabaseClient>, channel: BookingChannel) -> Self {
        Self { supabase, channel }
    }

    pub async fn count_by_time_slot(&self, date: NaiveDate) -> Result<HashMap<String, u32>, SchedulingError> {
        let path = format!("{}&select=appointment_time", self.base_path(date));
        let booked = self.fetch(&path).await?;

        let mut counts = HashMap::new();
        for row in booked {
            *counts.entry(row.appointment_time).or_insert(0) += 1;
        }

        debug!("{} bookings on {} across {} slots", self.channel, date, counts.len());
        Ok(counts)
    }

    /// Active bookings held by a single slot.
    pub async fn count_for_slot(&self, date: NaiveDate, time: &str) -> Result<u32, SchedulingError> {
        let path = format!(
            "{}&appointment_time=eq.{}&select=appointment_time",
            self.base_path(date),
            filter_value(time)
        );
        let booked = self.fetch(&path).await?;

        Ok(booked.len() as u32)
    }

    fn base_path(&self, date: NaiveDate) -> String {
        let mut path = format!(
            "/rest/v1/{}?appointment_date=eq.{}",
            self.channel.bookings_table(),
            date
        );
        if self.channel.counts_pending_only() {
            path.push_str("&status=eq.pending");
        }
        path
    }

    async fn fetch(&self, path: &str) -> Result<Vec<BookedTime>, SchedulingError> {
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            path,
            None,
            None,
        ).await.map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        result.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<BookedTime>, _>>()
            .map_err(|e| SchedulingError::DatabaseError(format!("Failed to parse bookings: {}", e)))
    }
}
