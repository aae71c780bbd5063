// src/store/memory.rs

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;

use super::{AppointmentStore, StoreError};
use crate::auth::hash_access_token;
use crate::models::{
    Appointment, AppointmentStatus, BookedSlot, Doctor, NewAppointment, Role, SessionRow,
};

/// In-process store with the same live-slot uniqueness rule as the partial
/// unique index in `migrations/`, and the same patient/doctor foreign keys.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    /// Pretend the conflict lookup saw nothing, as a racing writer would.
    pub blind_conflict_check: AtomicBool,
    /// Fail every call as a timed-out pool would.
    pub unavailable: AtomicBool,
}

#[derive(Default)]
struct Inner {
    sessions: HashMap<String, SessionRow>,
    users: HashSet<i64>,
    doctors: Vec<Doctor>,
    appointments: Vec<Appointment>,
    next_id: i64,
}

impl Inner {
    fn joined(&self, mut a: Appointment) -> Appointment {
        if let Some(d) = self.doctors.iter().find(|d| d.id == a.doctor_id) {
            a.doctor_name = Some(d.name.clone());
            a.city = d.city.clone();
            a.fee = d.fee;
            a.specialty = d.specialty.clone();
        }
        a
    }

    fn live_holder(&self, doctor_id: i64, date: &str, time: &str, except: Option<i64>) -> bool {
        self.appointments.iter().any(|a| {
            Some(a.id) != except
                && a.doctor_id == doctor_id
                && a.date == date
                && a.time == time
                && a.status.is_live()
        })
    }

    fn sorted(&self, mut rows: Vec<Appointment>) -> Vec<Appointment> {
        rows.sort_by(|a, b| (&a.date, &a.time, a.id).cmp(&(&b.date, &b.time, b.id)));
        rows.into_iter().map(|a| self.joined(a)).collect()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_doctor(self, id: i64, user_id: Option<i64>, name: &str) -> Self {
        self.inner.lock().unwrap().doctors.push(Doctor {
            id,
            user_id,
            name: name.to_string(),
            city: Some("Springfield".into()),
            fee: Some(50.0),
            specialty: Some("General Practice".into()),
        });
        self
    }

    pub fn with_user(self, user_id: i64) -> Self {
        self.inner.lock().unwrap().users.insert(user_id);
        self
    }

    pub fn with_session(self, token: &str, user_id: i64, role: Role) -> Self {
        self.inner.lock().unwrap().users.insert(user_id);
        self.inner.lock().unwrap().sessions.insert(
            hash_access_token(token),
            SessionRow {
                session_token_id: uuid::Uuid::new_v4(),
                user_id,
                role,
            },
        );
        self
    }

    /// Inserts a row directly, bypassing the uniqueness rule.
    pub fn seed(&self, doctor_id: i64, patient_id: i64, date: &str, time: &str, status: AppointmentStatus) -> i64 {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = inner.next_id;
        let now = Utc::now();
        inner.appointments.push(Appointment {
            id,
            doctor_id,
            patient_id,
            date: date.to_string(),
            time: time.to_string(),
            status,
            doctor_name: None,
            city: None,
            fee: None,
            specialty: None,
            created_at: now,
            updated_at: now,
        });
        id
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("storage call timed out".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl AppointmentStore for MemoryStore {
    async fn find_session(&self, token_hash: &str) -> Result<Option<SessionRow>, StoreError> {
        self.check_available()?;
        Ok(self.inner.lock().unwrap().sessions.get(token_hash).cloned())
    }

    async fn touch_session(&self, _session_token_id: uuid::Uuid) -> Result<(), StoreError> {
        self.check_available()
    }

    async fn find_doctor_by_id(&self, id: i64) -> Result<Option<Doctor>, StoreError> {
        self.check_available()?;
        let inner = self.inner.lock().unwrap();
        Ok(inner.doctors.iter().find(|d| d.id == id).cloned())
    }

    async fn find_doctor_by_user_id(&self, user_id: i64) -> Result<Option<Doctor>, StoreError> {
        self.check_available()?;
        let inner = self.inner.lock().unwrap();
        Ok(inner.doctors.iter().find(|d| d.user_id == Some(user_id)).cloned())
    }

    async fn list_appointments(&self, doctor_id: i64, date: &str) -> Result<Vec<BookedSlot>, StoreError> {
        self.check_available()?;
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<BookedSlot> = inner
            .appointments
            .iter()
            .filter(|a| a.doctor_id == doctor_id && a.date == date)
            .map(|a| BookedSlot {
                id: a.id,
                time: a.time.clone(),
                status: a.status,
            })
            .collect();
        rows.sort_by(|a, b| a.time.cmp(&b.time));
        Ok(rows)
    }

    async fn find_conflict(
        &self,
        doctor_id: i64,
        date: &str,
        time: &str,
    ) -> Result<Option<Appointment>, StoreError> {
        self.check_available()?;
        if self.blind_conflict_check.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let inner = self.inner.lock().unwrap();
        let found = inner
            .appointments
            .iter()
            .find(|a| a.doctor_id == doctor_id && a.date == date && a.time == time && a.status.is_live())
            .cloned();
        Ok(found.map(|a| inner.joined(a)))
    }

    async fn insert_appointment(&self, new: NewAppointment) -> Result<i64, StoreError> {
        self.check_available()?;
        let mut inner = self.inner.lock().unwrap();
        if new.status.is_live() && inner.live_holder(new.doctor_id, &new.date, &new.time, None) {
            return Err(StoreError::UniqueViolation);
        }
        if !inner.users.contains(&new.patient_id) || !inner.doctors.iter().any(|d| d.id == new.doctor_id) {
            return Err(StoreError::MissingReference);
        }
        inner.next_id += 1;
        let id = inner.next_id;
        let now = Utc::now();
        inner.appointments.push(Appointment {
            id,
            doctor_id: new.doctor_id,
            patient_id: new.patient_id,
            date: new.date,
            time: new.time,
            status: new.status,
            doctor_name: None,
            city: None,
            fee: None,
            specialty: None,
            created_at: now,
            updated_at: now,
        });
        Ok(id)
    }

    async fn find_appointment_by_id(&self, id: i64) -> Result<Option<Appointment>, StoreError> {
        self.check_available()?;
        let inner = self.inner.lock().unwrap();
        let found = inner.appointments.iter().find(|a| a.id == id).cloned();
        Ok(found.map(|a| inner.joined(a)))
    }

    async fn update_appointment_status(&self, id: i64, status: AppointmentStatus) -> Result<(), StoreError> {
        self.check_available()?;
        let mut inner = self.inner.lock().unwrap();
        let Some(current) = inner.appointments.iter().find(|a| a.id == id).cloned() else {
            return Ok(());
        };
        if status.is_live() && inner.live_holder(current.doctor_id, &current.date, &current.time, Some(id)) {
            return Err(StoreError::UniqueViolation);
        }
        if let Some(a) = inner.appointments.iter_mut().find(|a| a.id == id) {
            a.status = status;
            a.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn update_appointment_date_time(
        &self,
        id: i64,
        date: &str,
        time: &str,
        status: AppointmentStatus,
    ) -> Result<(), StoreError> {
        self.check_available()?;
        let mut inner = self.inner.lock().unwrap();
        let Some(current) = inner.appointments.iter().find(|a| a.id == id).cloned() else {
            return Ok(());
        };
        if status.is_live() && inner.live_holder(current.doctor_id, date, time, Some(id)) {
            return Err(StoreError::UniqueViolation);
        }
        if let Some(a) = inner.appointments.iter_mut().find(|a| a.id == id) {
            a.date = date.to_string();
            a.time = time.to_string();
            a.status = status;
            a.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn list_by_patient(&self, patient_id: i64) -> Result<Vec<Appointment>, StoreError> {
        self.check_available()?;
        let inner = self.inner.lock().unwrap();
        let rows = inner
            .appointments
            .iter()
            .filter(|a| a.patient_id == patient_id)
            .cloned()
            .collect();
        Ok(inner.sorted(rows))
    }

    async fn list_by_doctor(&self, doctor_id: i64) -> Result<Vec<Appointment>, StoreError> {
        self.check_available()?;
        let inner = self.inner.lock().unwrap();
        let rows = inner
            .appointments
            .iter()
            .filter(|a| a.doctor_id == doctor_id)
            .cloned()
            .collect();
        Ok(inner.sorted(rows))
    }
}
