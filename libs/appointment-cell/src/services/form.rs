// libs/appointment-cell/src/services/form.rs
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use tracing::{debug, warn};

use patient_cell::{Patient, PatientService};
use scheduling_cell::{
    AvailableSlot, BookingChannel, SchedulingError, SlotAvailabilityEngine, SLOT_LOAD_FAILED_NOTICE,
};
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_utils::{ClinicTime, Clock};

use crate::models::{Appointment, AppointmentError, BookingRequest};
use crate::services::placement::BookingPlacementService;

const PHONE_LENGTH: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub enum FormState {
    Idle,
    SlotsLoading,
    Ready,
    Submitting,
    Success(Appointment),
    Error(String),
}

/// Field values of the booking form.
#[derive(Debug, Clone, PartialEq)]
pub struct AppointmentForm {
    pub name: String,
    pub phone: String,
    pub age: Option<u32>,
    pub city: String,
    pub date: NaiveDate,
    pub time_slot: Option<String>,
}

impl AppointmentForm {
    pub fn blank(date: NaiveDate) -> Self {
        Self {
            name: String::new(),
            phone: String::new(),
            age: None,
            city: String::new(),
            date,
            time_slot: None,
        }
    }

    fn to_request(&self) -> BookingRequest {
        BookingRequest {
            name: self.name.trim().to_string(),
            phone: self.phone.trim().to_string(),
            age: self.age,
            city: self.city.clone(),
            appointment_date: Some(self.date),
            appointment_time: self.time_slot.clone(),
        }
    }
}

/// Everything the booking page renders.
#[derive(Debug, Clone, PartialEq)]
pub struct FormSnapshot {
    pub form: AppointmentForm,
    pub state: FormState,
    pub slots: Vec<AvailableSlot>,
    pub notice: Option<String>,
    pub patient: Option<Patient>,
    pub last_booking: Option<Appointment>,
}

/// Drives the patient booking form: slot loading on date changes, patient
/// auto-fill from the phone number, and submission.
///
/// Slot loads are tagged with a monotonically increasing token. A load whose
/// token is no longer the latest when it completes is discarded, so the last
/// date selected always wins.
pub struct AppointmentFormController {
    engine: SlotAvailabilityEngine,
    patients: PatientService,
    placement: BookingPlacementService,
    clinic_time: ClinicTime,
    clock: Arc<dyn Clock>,
    load_token: AtomicU64,
    inner: Mutex<FormSnapshot>,
}

impl AppointmentFormController {
    pub fn new(config: &AppConfig, clock: Arc<dyn Clock>) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        let clinic_time = ClinicTime::from_policy(&config.booking);
        let today = clinic_time.today(clock.as_ref());

        Self {
            engine: SlotAvailabilityEngine::with_client(
                Arc::clone(&supabase),
                config.booking.clone(),
                Arc::clone(&clock),
                BookingChannel::Clinic,
            ),
            patients: PatientService::with_client(Arc::clone(&supabase)),
            placement: BookingPlacementService::with_client(supabase, &config.booking, Arc::clone(&clock)),
            clinic_time,
            clock,
            load_token: AtomicU64::new(0),
            inner: Mutex::new(FormSnapshot {
                form: AppointmentForm::blank(today),
                state: FormState::Idle,
                slots: vec![],
                notice: None,
                patient: None,
                last_booking: None,
            }),
        }
    }

    pub fn snapshot(&self) -> FormSnapshot {
        self.lock().clone()
    }

    pub fn set_name(&self, name: &str) {
        self.lock().form.name = name.to_string();
    }

    pub fn set_age(&self, age: Option<u32>) {
        self.lock().form.age = age;
    }

    pub fn set_city(&self, city: &str) {
        self.lock().form.city = city.to_string();
    }

    pub fn select_slot(&self, time: &str) {
        self.lock().form.time_slot = Some(time.to_string());
    }

    /// Loads today's slots for a freshly opened form.
    pub async fn start(&self) {
        let today = self.clinic_time.today(self.clock.as_ref());
        self.on_date_changed(today).await;
    }

    /// Once the phone field holds ten characters, looks the patient up and
    /// pre-fills name, age and city. Any other outcome just forgets the
    /// previously matched patient.
    pub async fn on_phone_changed(&self, phone: &str) {
        {
            let mut inner = self.lock();
            inner.form.phone = phone.to_string();
            inner.patient = None;
        }

        if phone.chars().count() != PHONE_LENGTH {
            return;
        }

        let found = match self.patients.find_by_phone(phone, None).await {
            Ok(found) => found,
            Err(e) => {
                warn!("Patient lookup failed: {}", e);
                None
            }
        };

        let mut inner = self.lock();
        if inner.form.phone != phone {
            debug!("Phone changed during lookup; ignoring result");
            return;
        }
        if let Some(patient) = found {
            let autofill = patient.autofill();
            inner.form.name = autofill.name;
            if autofill.age.is_some() {
                inner.form.age = autofill.age;
            }
            if let Some(city) = autofill.city {
                inner.form.city = city;
            }
            inner.patient = Some(patient);
        }
    }

    /// Selects `date` and loads its slots. Slot choice is disabled until the
    /// load finishes.
    pub async fn on_date_changed(&self, date: NaiveDate) {
        let token = {
            let mut inner = self.lock();
            inner.form.date = date;
            inner.form.time_slot = None;
            inner.slots.clear();
            inner.notice = None;
            inner.state = FormState::SlotsLoading;
            self.next_token()
        };

        self.load_slots(date, token).await;
    }

    /// Validates and places the booking. On success the form resets to
    /// today and its slots are reloaded; on failure the form keeps its values.
    pub async fn submit(&self) -> Result<Appointment, AppointmentError> {
        let (request, known_patient) = {
            let mut inner = self.lock();
            inner.state = FormState::Submitting;
            inner.notice = None;
            (inner.form.to_request(), inner.patient.clone())
        };

        match self.placement.place(request, known_patient).await {
            Ok(appointment) => {
                let today = self.clinic_time.today(self.clock.as_ref());
                let token = {
                    let mut inner = self.lock();
                    inner.form = AppointmentForm::blank(today);
                    inner.patient = None;
                    inner.slots.clear();
                    inner.last_booking = Some(appointment.clone());
                    inner.state = FormState::Success(appointment.clone());
                    self.next_token()
                };
                self.load_slots(today, token).await;
                Ok(appointment)
            }
            Err(e) => {
                self.lock().state = FormState::Error(e.user_message());
                Err(e)
            }
        }
    }

    async fn load_slots(&self, date: NaiveDate, token: u64) {
        let result = self.engine.load_available_slots(date).await;
        self.apply_slot_load(date, token, result);
    }

    /// Tokens are issued and compared while holding the form lock.
    fn apply_slot_load(
        &self,
        date: NaiveDate,
        token: u64,
        result: Result<Vec<AvailableSlot>, SchedulingError>,
    ) {
        let mut inner = self.lock();
        if self.load_token.load(Ordering::SeqCst) != token {
            debug!("Discarding stale slot load for {}", date);
            return;
        }

        match result {
            Ok(slots) => inner.slots = slots,
            Err(e) => {
                warn!("Failed to load slots for {}: {}", date, e);
                inner.slots.clear();
                inner.notice = Some(SLOT_LOAD_FAILED_NOTICE.to_string());
            }
        }
        if inner.state == FormState::SlotsLoading {
            inner.state = FormState::Ready;
        }
    }

    fn next_token(&self) -> u64 {
        self.load_token.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn lock(&self) -> MutexGuard<'_, FormSnapshot> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_utils::test_utils::{clock_at_clinic_time, TestConfig};

    fn slot(time: &str) -> AvailableSlot {
        AvailableSlot { time: time.to_string(), max_bookings: 3, current_bookings: 0 }
    }

    fn date(raw: &str) -> NaiveDate {
        raw.parse().unwrap()
    }

    #[test]
    fn test_stale_load_after_newer_one_is_discarded() {
        let config = TestConfig::default().to_app_config();
        let controller = AppointmentFormController::new(&config, Arc::new(clock_at_clinic_time(2026, 10, 19, 10, 0)));

        let monday = { controller.lock().form.date = date("2026-10-26"); controller.next_token() };
        let tuesday = { controller.lock().form.date = date("2026-10-27"); controller.next_token() };

        controller.apply_slot_load(date("2026-10-27"), tuesday, Ok(vec![slot("11:00 AM")]));
        controller.apply_slot_load(date("2026-10-26"), monday, Ok(vec![slot("09:30 AM")]));

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.form.date, date("2026-10-27"));
        assert_eq!(snapshot.slots, vec![slot("11:00 AM")]);
    }
}
