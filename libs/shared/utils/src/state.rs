use std::sync::Arc;

use shared_config::AppConfig;

use crate::clinic_time::ClinicTime;
use crate::clock::{system_clock, Clock};

/// Router state shared by every cell.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self::with_clock(config, system_clock())
    }

    pub fn with_clock(config: AppConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config: Arc::new(config),
            clock,
        }
    }

    pub fn clinic_time(&self) -> ClinicTime {
        ClinicTime::from_policy(&self.config.booking)
    }
}
