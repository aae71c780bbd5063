// src/store/mod.rs

use async_trait::async_trait;

use crate::models::{Appointment, AppointmentStatus, BookedSlot, Doctor, NewAppointment, SessionRow};

#[cfg(test)]
pub mod memory;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The live-slot uniqueness constraint rejected a write.
    #[error("unique constraint violated")]
    UniqueViolation,
    /// A written row references a user or doctor that does not exist.
    #[error("foreign key constraint violated")]
    MissingReference,
    /// Timed out or could not reach the database; safe to retry.
    #[error("{0}")]
    Unavailable(String),
    #[error("{0}")]
    Database(String),
}

/// Queries the booking core runs against the relational store.
///
/// Dates are `YYYY-MM-DD` and times `HH:MM`; implementations must return them
/// in the same zero-padded form so callers can compare them as strings.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn find_session(&self, token_hash: &str) -> Result<Option<SessionRow>, StoreError>;

    async fn touch_session(&self, session_token_id: uuid::Uuid) -> Result<(), StoreError>;

    async fn find_doctor_by_id(&self, id: i64) -> Result<Option<Doctor>, StoreError>;

    async fn find_doctor_by_user_id(&self, user_id: i64) -> Result<Option<Doctor>, StoreError>;

    /// Every appointment of the doctor on that day, any status, ordered by time.
    async fn list_appointments(&self, doctor_id: i64, date: &str) -> Result<Vec<BookedSlot>, StoreError>;

    /// A live (`booked`/`confirmed`) appointment holding the triple, if any.
    async fn find_conflict(
        &self,
        doctor_id: i64,
        date: &str,
        time: &str,
    ) -> Result<Option<Appointment>, StoreError>;

    /// Returns the new id. A second live row for the same triple fails with
    /// [`StoreError::UniqueViolation`]; an unknown patient with
    /// [`StoreError::MissingReference`].
    async fn insert_appointment(&self, new: NewAppointment) -> Result<i64, StoreError>;

    async fn find_appointment_by_id(&self, id: i64) -> Result<Option<Appointment>, StoreError>;

    async fn update_appointment_status(&self, id: i64, status: AppointmentStatus) -> Result<(), StoreError>;

    async fn update_appointment_date_time(
        &self,
        id: i64,
        date: &str,
        time: &str,
        status: AppointmentStatus,
    ) -> Result<(), StoreError>;

    /// Ordered by date then time ascending.
    async fn list_by_patient(&self, patient_id: i64) -> Result<Vec<Appointment>, StoreError>;

    /// Ordered by date then time ascending.
    async fn list_by_doctor(&self, doctor_id: i64) -> Result<Vec<Appointment>, StoreError>;
}
