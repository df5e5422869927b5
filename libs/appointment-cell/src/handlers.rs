// libs/appointment-cell/src/handlers.rs
use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::{
    AppointmentError, AppointmentListQuery, BookingRequest, BookingValidation, MrAppointmentListQuery,
    MrBookingRequest, UpdateStatusRequest,
};
use crate::services::{AppointmentAdminService, BookingPlacementService, MrAppointmentService};

impl From<AppointmentError> for AppError {
    fn from(error: AppointmentError) -> Self {
        match error {
            AppointmentError::NotFound => AppError::NotFound(error.to_string()),
            AppointmentError::Rejected(rejection) => AppError::BookingRejected(rejection.to_string()),
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

// ==============================================================================
// PUBLIC BOOKING
// ==============================================================================

pub async fn validate_booking(
    State(state): State<AppState>,
    Json(request): Json<BookingRequest>,
) -> Json<BookingValidation> {
    let placement = BookingPlacementService::new(&state.config, state.clock.clone());

    let validation = placement.validator().validate(
        request.name.trim(),
        request.phone.trim(),
        request.appointment_date,
        request.appointment_time.as_deref(),
    ).await;

    Json(validation)
}

pub async fn book_appointment(
    State(state): State<AppState>,
    Json(request): Json<BookingRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let placement = BookingPlacementService::new(&state.config, state.clock.clone());

    let appointment = placement.place(request, None).await?;

    Ok((StatusCode::CREATED, Json(json!({
        "success": true,
        "appointment": appointment,
    }))))
}

pub async fn validate_mr_booking(
    State(state): State<AppState>,
    Json(request): Json<MrBookingRequest>,
) -> Json<BookingValidation> {
    let service = MrAppointmentService::new(&state.config, state.clock.clone());
    Json(service.validate(&request).await)
}

pub async fn book_mr_appointment(
    State(state): State<AppState>,
    Json(request): Json<MrBookingRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = MrAppointmentService::new(&state.config, state.clock.clone());

    let visit = service.book(request).await?;

    Ok((StatusCode::CREATED, Json(json!({
        "success": true,
        "appointment": visit,
    }))))
}

// ==============================================================================
// ADMIN: APPOINTMENTS
// ==============================================================================

pub async fn list_appointments(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentAdminService::new(&state.config);

    let appointments = service.list_by_date(query.date, query.status, auth.token()).await?;

    Ok(Json(json!({
        "date": query.date,
        "appointments": appointments,
        "total": appointments.len(),
    })))
}

pub async fn update_appointment_status(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    info!("{} is marking appointment {} {}", user.display_name(), appointment_id, request.status);

    let service = AppointmentAdminService::new(&state.config);
    let appointment = service.update_status(appointment_id, request.status, auth.token()).await?;

    Ok(Json(json!(appointment)))
}

pub async fn delete_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    info!("{} is deleting appointment {}", user.display_name(), appointment_id);

    let service = AppointmentAdminService::new(&state.config);
    service.delete(appointment_id, auth.token()).await?;

    Ok(Json(json!({ "success": true, "id": appointment_id })))
}

// ==============================================================================
// ADMIN: MR APPOINTMENTS
// ==============================================================================

pub async fn list_mr_appointments(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<MrAppointmentListQuery>,
) -> Result<Json<Value>, AppError> {
    let service = MrAppointmentService::new(&state.config, state.clock.clone());

    let visits = service.list_by_date(query.date, auth.token()).await?;

    Ok(Json(json!({
        "date": query.date,
        "appointments": visits,
        "total": visits.len(),
    })))
}

pub async fn delete_mr_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(visit_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    info!("{} is deleting MR visit {}", user.display_name(), visit_id);

    let service = MrAppointmentService::new(&state.config, state.clock.clone());
    service.delete(visit_id, auth.token()).await?;

    Ok(Json(json!({ "success": true, "id": visit_id })))
}
