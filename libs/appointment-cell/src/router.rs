// libs/appointment-cell/src/router.rs
use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};

use shared_utils::extractor::auth_middleware;
use shared_utils::AppState;

use crate::handlers;

pub fn appointment_routes(state: AppState) -> Router {
    // Booking form
    let public_routes = Router::new()
        .route("/appointments", post(handlers::book_appointment))
        .route("/appointments/validate", post(handlers::validate_booking))
        .route("/mr/appointments", post(handlers::book_mr_appointment))
        .route("/mr/appointments/validate", post(handlers::validate_mr_booking));

    let protected_routes = Router::new()
        .route("/admin/appointments", get(handlers::list_appointments))
        .route("/admin/appointments/{appointment_id}", delete(handlers::delete_appointment))
        .route("/admin/appointments/{appointment_id}/status", patch(handlers::update_appointment_status))
        .route("/admin/mr-appointments", get(handlers::list_mr_appointments))
        .route("/admin/mr-appointments/{visit_id}", delete(handlers::delete_mr_appointment))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
