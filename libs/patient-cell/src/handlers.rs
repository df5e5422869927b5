use axum::{
    extract::{Query, State},
    Json,
};
use serde_json::{json, Value};

use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::{PatientError, PatientLookupQuery};
use crate::services::PatientService;

impl From<PatientError> for AppError {
    fn from(error: PatientError) -> Self {
        match error {
            PatientError::NotFound => AppError::NotFound(error.to_string()),
            PatientError::ValidationError(msg) => AppError::ValidationError(msg),
            PatientError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

/// Booking-form auto-fill. An unknown phone is not an error: the response
/// simply carries no patient.
pub async fn lookup_patient(
    State(state): State<AppState>,
    Query(query): Query<PatientLookupQuery>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&state.config);

    let patient = service.find_by_phone(query.phone.trim(), None).await?;

    Ok(Json(json!({
        "found": patient.is_some(),
        "patient": patient.map(|p| p.autofill()),
    })))
}
