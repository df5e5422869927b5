pub mod availability;
pub mod booking_counts;
pub mod closure;
pub mod time_format;
pub mod working_hours;

pub use availability::{SlotAvailabilityEngine, SLOT_LOAD_FAILED_NOTICE};
pub use booking_counts::BookingCountAggregator;
pub use closure::ClosureDateChecker;
pub use working_hours::WorkingHoursRepository;
