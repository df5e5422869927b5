pub mod admin;
pub mod form;
pub mod mr;
pub mod placement;
pub mod validator;

pub use admin::AppointmentAdminService;
pub use form::{AppointmentForm, AppointmentFormController, FormSnapshot, FormState};
pub use mr::MrAppointmentService;
pub use placement::BookingPlacementService;
pub use validator::BookingValidator;
