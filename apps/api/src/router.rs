use axum::{routing::get, Router};

use appointment_cell::appointment_routes;
use patient_cell::patient_routes;
use scheduling_cell::scheduling_routes;
use shared_utils::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic booking API is running!" }))
        .merge(scheduling_routes(state.clone()))
        .merge(patient_routes(state.clone()))
        .merge(appointment_routes(state))
}
