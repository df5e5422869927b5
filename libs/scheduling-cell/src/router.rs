// libs/scheduling-cell/src/router.rs
use axum::{
    middleware,
    routing::{delete, get, put},
    Extension, Router,
};

use shared_utils::extractor::auth_middleware;
use shared_utils::AppState;

use crate::handlers;
use crate::models::BookingChannel;

pub fn scheduling_routes(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/slots", get(handlers::get_available_slots))
        .layer(Extension(BookingChannel::Clinic))
        .merge(
            Router::new()
                .route("/mr/slots", get(handlers::get_available_slots))
                .layer(Extension(BookingChannel::MedicalRepresentative)),
        );

    // Admin console: weekday schedules and closures of both channels
    let protected_routes = Router::new()
        .merge(
            Router::new()
                .route("/admin/working-hours", get(handlers::list_schedules))
                .route("/admin/working-hours/{day}", put(handlers::update_working_hours))
                .route("/admin/working-hours/{day}/slots", put(handlers::replace_slots))
                .route("/admin/closures", get(handlers::list_closures).post(handlers::create_closures))
                .route("/admin/closures/{date}", delete(handlers::delete_closure))
                .layer(Extension(BookingChannel::Clinic)),
        )
        .merge(
            Router::new()
                .route("/admin/mr-weekdays", get(handlers::list_schedules))
                .route("/admin/mr-weekdays/{day}/slots", put(handlers::replace_slots))
                .route("/admin/mr-closures", get(handlers::list_closures).post(handlers::create_closures))
                .route("/admin/mr-closures/{date}", delete(handlers::delete_closure))
                .layer(Extension(BookingChannel::MedicalRepresentative)),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
