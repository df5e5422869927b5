pub mod clinic_time;
pub mod clock;
pub mod extractor;
pub mod jwt;
pub mod state;
pub mod test_utils;

pub use clinic_time::ClinicTime;
pub use clock::{Clock, FixedClock, SystemClock};
pub use state::AppState;
