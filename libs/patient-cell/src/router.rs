use axum::{routing::get, Router};

use shared_utils::AppState;

use crate::handlers::lookup_patient;

pub fn patient_routes(state: AppState) -> Router {
    Router::new()
        .route("/patients/lookup", get(lookup_patient))
        .with_state(state)
}
