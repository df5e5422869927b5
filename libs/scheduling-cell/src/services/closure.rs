// libs/scheduling-cell/src/services/closure.rs
use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use shared_config::ClosureCheckPolicy;
use shared_database::supabase::SupabaseClient;

use crate::models::{BookingChannel, ClosureDate, ClosureStatus, CreateClosureRequest, SchedulingError};

/// Longest range an admin may close in one request.
const MAX_CLOSURE_RANGE_DAYS: i64 = 366;

pub struct ClosureDateChecker {
    supabase: Arc<SupabaseClient>,
    channel: BookingChannel,
    policy: ClosureCheckPolicy,
}

impl ClosureDateChecker {
    pub fn new(supabase: Arc<SupabaseClient>, channel: BookingChannel, policy: ClosureCheckPolicy) -> Self {
        Self { supabase, channel, policy }
    }

    /// Whether the channel is closed on `date`. Never fails: a read error is
    /// logged and resolved according to the configured policy.
    pub async fn is_closed(&self, date: NaiveDate) -> ClosureStatus {
        match self.find_closure(date).await {
            Ok(Some(closure)) => {
                debug!("{} closed on {}: {:?}", self.channel, date, closure.reason);
                ClosureStatus::closed(closure.reason)
            }
            Ok(None) => ClosureStatus::open(),
            Err(e) => match self.policy {
                ClosureCheckPolicy::FailOpen => {
                    warn!("Closure check for {} on {} failed, treating as open: {}", self.channel, date, e);
                    ClosureStatus::open()
                }
                ClosureCheckPolicy::FailClosed => {
                    warn!("Closure check for {} on {} failed, treating as closed: {}", self.channel, date, e);
                    ClosureStatus::closed(None)
                }
            },
        }
    }

    pub async fn find_closure(&self, date: NaiveDate) -> Result<Option<ClosureDate>, SchedulingError> {
        let path = format!(
            "/rest/v1/{}?date=eq.{}&limit=1",
            self.channel.closure_table(),
            date
        );

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            None,
            None,
        ).await.map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        result.into_iter()
            .next()
            .map(serde_json::from_value::<ClosureDate>)
            .transpose()
            .map_err(|e| SchedulingError::DatabaseError(format!("Failed to parse closure date: {}", e)))
    }

    /// All closures, earliest first.
    pub async fn list_closures(&self, auth_token: Option<&str>) -> Result<Vec<ClosureDate>, SchedulingError> {
        let path = format!("/rest/v1/{}?order=date.asc", self.channel.closure_table());

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            auth_token,
            None,
        ).await.map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        parse_closures(result)
    }

    /// Closes every date of the requested (inclusive) range. Dates that are
    /// already closed are left untouched; the newly created rows are returned.
    pub async fn create_closures(
        &self,
        request: CreateClosureRequest,
        auth_token: Option<&str>,
    ) -> Result<Vec<ClosureDate>, SchedulingError> {
        let dates = expand_date_range(request.start_date, request.end_date)?;
        let reason = request.reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| self.channel.default_closure_reason().to_string());

        let (first, last) = (dates[0], dates[dates.len() - 1]);
        let existing_path = format!(
            "/rest/v1/{}?date=gte.{}&date=lte.{}&select=date",
            self.channel.closure_table(),
            first,
            last
        );
        let existing: Vec<Value> = self.supabase.request(
            Method::GET,
            &existing_path,
            auth_token,
            None,
        ).await.map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        let already_closed: HashSet<String> = existing.iter()
            .filter_map(|row| row["date"].as_str().map(str::to_string))
            .collect();

        let rows: Vec<Value> = dates.iter()
            .filter(|date| !already_closed.contains(&date.to_string()))
            .map(|date| json!({ "date": date, "reason": reason }))
            .collect();

        if rows.is_empty() {
            debug!("All {} requested {} closure dates already exist", dates.len(), self.channel);
            return Ok(vec![]);
        }

        let created = self.supabase.request_returning(
            Method::POST,
            &format!("/rest/v1/{}", self.channel.closure_table()),
            auth_token,
            Value::Array(rows),
        ).await.map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        info!("Created {} {} closure dates from {} to {}", created.len(), self.channel, first, last);
        parse_closures(created)
    }

    pub async fn delete_closure(&self, date: NaiveDate, auth_token: Option<&str>) -> Result<(), SchedulingError> {
        let path = format!("/rest/v1/{}?date=eq.{}", self.channel.closure_table(), date);

        let deleted = self.supabase.delete_returning(&path, auth_token)
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        if deleted.is_empty() {
            return Err(SchedulingError::NotFound(format!("Closure on {}", date)));
        }

        info!("Reopened {} on {}", self.channel, date);
        Ok(())
    }
}

fn parse_closures(rows: Vec<Value>) -> Result<Vec<ClosureDate>, SchedulingError> {
    rows.into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<ClosureDate>, _>>()
        .map_err(|e| SchedulingError::DatabaseError(format!("Failed to parse closure dates: {}", e)))
}

/// One date per day of the inclusive range; a missing end means a single day.
pub fn expand_date_range(start: NaiveDate, end: Option<NaiveDate>) -> Result<Vec<NaiveDate>, SchedulingError> {
    let end = end.unwrap_or(start);
    if end < start {
        return Err(SchedulingError::ValidationError(
            "End date must not be before start date".to_string(),
        ));
    }

    let span = (end - start).num_days() + 1;
    if span > MAX_CLOSURE_RANGE_DAYS {
        return Err(SchedulingError::ValidationError(format!(
            "A closure range may cover at most {} days",
            MAX_CLOSURE_RANGE_DAYS
        )));
    }

    Ok(start.iter_days().take(span as usize).collect())
}
