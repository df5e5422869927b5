// libs/scheduling-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::NaiveDate;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::info;

use shared_database::SupabaseClient;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::{
    BookingChannel, ClinicWeekday, CreateClosureRequest, ReplaceSlotsRequest, SchedulingError,
    SlotQuery, UpdateWorkingHoursRequest,
};
use crate::services::{
    ClosureDateChecker, SlotAvailabilityEngine, WorkingHoursRepository, SLOT_LOAD_FAILED_NOTICE,
};

impl From<SchedulingError> for AppError {
    fn from(error: SchedulingError) -> Self {
        match error {
            SchedulingError::NotFound(what) => AppError::NotFound(format!("{} not found", what)),
            SchedulingError::InvalidTime(_) | SchedulingError::ValidationError(_) => {
                AppError::ValidationError(error.to_string())
            }
            SchedulingError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

fn supabase_for(state: &AppState) -> Arc<SupabaseClient> {
    Arc::new(SupabaseClient::new(&state.config))
}

// ==============================================================================
// PUBLIC
// ==============================================================================

pub async fn get_available_slots(
    State(state): State<AppState>,
    Extension(channel): Extension<BookingChannel>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<Value>, AppError> {
    let engine = SlotAvailabilityEngine::new(&state.config, state.clock.clone(), channel);

    let body = match engine.load_available_slots(query.date).await {
        Ok(slots) => json!({
            "date": query.date,
            "slots": slots,
        }),
        Err(_) => json!({
            "date": query.date,
            "slots": [],
            "notice": SLOT_LOAD_FAILED_NOTICE,
        }),
    };

    Ok(Json(body))
}

// ==============================================================================
// ADMIN: WEEKDAY SCHEDULES
// ==============================================================================

pub async fn list_schedules(
    State(state): State<AppState>,
    Extension(channel): Extension<BookingChannel>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let repository = WorkingHoursRepository::new(supabase_for(&state), channel);
    let schedules = repository.list(Some(auth.token())).await?;

    Ok(Json(json!({ "schedules": schedules })))
}

pub async fn update_working_hours(
    State(state): State<AppState>,
    Extension(channel): Extension<BookingChannel>,
    Extension(user): Extension<User>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(day): Path<String>,
    Json(request): Json<UpdateWorkingHoursRequest>,
) -> Result<Json<Value>, AppError> {
    let day: ClinicWeekday = day.parse()?;
    info!("{} is updating {} working hours for {}", user.display_name(), channel, day);

    let repository = WorkingHoursRepository::new(supabase_for(&state), channel);
    let schedule = repository.update_working_hours(day, request, Some(auth.token())).await?;

    Ok(Json(json!(schedule)))
}

pub async fn replace_slots(
    State(state): State<AppState>,
    Extension(channel): Extension<BookingChannel>,
    Extension(user): Extension<User>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(day): Path<String>,
    Json(request): Json<ReplaceSlotsRequest>,
) -> Result<Json<Value>, AppError> {
    let day: ClinicWeekday = day.parse()?;
    info!("{} is replacing {} slots for {}", user.display_name(), channel, day);

    let repository = WorkingHoursRepository::new(supabase_for(&state), channel);
    let schedule = repository.replace_slots(day, request, Some(auth.token())).await?;

    Ok(Json(json!(schedule)))
}

// ==============================================================================
// ADMIN: CLOSURES
// ==============================================================================

pub async fn list_closures(
    State(state): State<AppState>,
    Extension(channel): Extension<BookingChannel>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let checker = ClosureDateChecker::new(supabase_for(&state), channel, state.config.booking.closure_check_policy);
    let closures = checker.list_closures(Some(auth.token())).await?;

    Ok(Json(json!({ "closures": closures })))
}

pub async fn create_closures(
    State(state): State<AppState>,
    Extension(channel): Extension<BookingChannel>,
    Extension(user): Extension<User>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<CreateClosureRequest>,
) -> Result<Json<Value>, AppError> {
    info!("{} is closing {} from {}", user.display_name(), channel, request.start_date);

    let checker = ClosureDateChecker::new(supabase_for(&state), channel, state.config.booking.closure_check_policy);
    let created = checker.create_closures(request, Some(auth.token())).await?;

    Ok(Json(json!({
        "created": created,
        "total": created.len()
    })))
}

pub async fn delete_closure(
    State(state): State<AppState>,
    Extension(channel): Extension<BookingChannel>,
    Extension(user): Extension<User>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(date): Path<NaiveDate>,
) -> Result<Json<Value>, AppError> {
    info!("{} is reopening {} on {}", user.display_name(), channel, date);

    let checker = ClosureDateChecker::new(supabase_for(&state), channel, state.config.booking.closure_check_policy);
    checker.delete_closure(date, Some(auth.token())).await?;

    Ok(Json(json!({ "success": true, "date": date })))
}
