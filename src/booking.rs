// src/booking.rs

use std::sync::Arc;

use tracing::{info, warn};

use crate::availability;
use crate::clock::{self, Clock};
use crate::error::BookingError;
use crate::models::{Appointment, AppointmentStatus, NewAppointment, Role, Slot};
use crate::schedule::ScheduleConfig;
use crate::store::AppointmentStore;

/// Outcome of a cancel request.
#[derive(Debug)]
pub struct Cancellation {
    pub appointment: Appointment,
    pub already_cancelled: bool,
}

/// Booking, rescheduling and cancellation against the current store state.
///
/// Slot lists handed out earlier are advisory; every write re-checks past
/// time, blackout and conflicts here, and relies on the store's uniqueness
/// rule for the race between check and write.
#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn AppointmentStore>,
    clock: Arc<dyn Clock>,
    schedule: Arc<ScheduleConfig>,
}

impl BookingService {
    pub fn new(store: Arc<dyn AppointmentStore>, clock: Arc<dyn Clock>, schedule: ScheduleConfig) -> Self {
        Self {
            store,
            clock,
            schedule: Arc::new(schedule),
        }
    }

    pub async fn slots_for_day(&self, doctor_id: i64, date: &str) -> Result<Vec<Slot>, BookingError> {
        availability::resolve_day(
            self.store.as_ref(),
            self.clock.as_ref(),
            &self.schedule,
            doctor_id,
            date,
        )
        .await
    }

    pub async fn book(
        &self,
        doctor_id: i64,
        patient_id: i64,
        date: &str,
        time: &str,
    ) -> Result<Appointment, BookingError> {
        if doctor_id <= 0 || patient_id <= 0 || !clock::is_iso_date(date) || !clock::is_hhmm(time) {
            return Err(BookingError::Validation(
                "doctorId, date(YYYY-MM-DD), time(HH:MM) required".into(),
            ));
        }

        if self.store.find_doctor_by_id(doctor_id).await?.is_none() {
            return Err(BookingError::NotFound("Doctor not found".into()));
        }

        self.check_bookable(date, time, "book")?;

        if self.store.find_conflict(doctor_id, date, time).await?.is_some() {
            warn!("doctor {doctor_id} already booked at {date} {time}");
            return Err(BookingError::Conflict);
        }

        let id = self
            .store
            .insert_appointment(NewAppointment {
                doctor_id,
                patient_id,
                date: date.to_string(),
                time: time.to_string(),
                status: AppointmentStatus::Booked,
            })
            .await
            .inspect_err(|e| warn!("insert for doctor {doctor_id} at {date} {time} failed: {e}"))?;

        info!("appointment {id} booked: doctor {doctor_id}, patient {patient_id}, {date} {time}");
        self.reload(id).await
    }

    pub async fn reschedule(
        &self,
        appointment_id: i64,
        requester_id: i64,
        requester_role: Role,
        new_date: &str,
        new_time: &str,
    ) -> Result<Appointment, BookingError> {
        let existing = self.owned_appointment(appointment_id, requester_id, requester_role, "reschedule").await?;

        if !clock::is_iso_date(new_date) || !clock::is_hhmm(new_time) {
            return Err(BookingError::Validation(
                "date(YYYY-MM-DD) and time(HH:MM) required".into(),
            ));
        }

        self.check_bookable(new_date, new_time, "reschedule to")?;

        let conflict = self
            .store
            .find_conflict(existing.doctor_id, new_date, new_time)
            .await?;
        // the appointment may already hold the slot it is moving to
        if conflict.is_some_and(|c| c.id != appointment_id) {
            warn!(
                "reschedule of {appointment_id} blocked: doctor {} already booked at {new_date} {new_time}",
                existing.doctor_id
            );
            return Err(BookingError::Conflict);
        }

        self.store
            .update_appointment_date_time(appointment_id, new_date, new_time, AppointmentStatus::Booked)
            .await?;

        info!(
            "appointment {appointment_id} rescheduled from {} {} to {new_date} {new_time}",
            existing.date, existing.time
        );
        self.reload(appointment_id).await
    }

    pub async fn cancel(
        &self,
        appointment_id: i64,
        requester_id: i64,
        requester_role: Role,
    ) -> Result<Cancellation, BookingError> {
        let existing = self.owned_appointment(appointment_id, requester_id, requester_role, "cancel").await?;

        if existing.status == AppointmentStatus::Cancelled {
            return Ok(Cancellation {
                appointment: existing,
                already_cancelled: true,
            });
        }

        self.store
            .update_appointment_status(appointment_id, AppointmentStatus::Cancelled)
            .await?;

        info!("appointment {appointment_id} cancelled by user {requester_id}");
        Ok(Cancellation {
            appointment: self.reload(appointment_id).await?,
            already_cancelled: false,
        })
    }

    /// Doctor-initiated status change. Any of the four statuses may be set.
    pub async fn update_status(
        &self,
        appointment_id: i64,
        requester_id: i64,
        requester_role: Role,
        status: &str,
    ) -> Result<Appointment, BookingError> {
        let status = status
            .parse::<AppointmentStatus>()
            .map_err(|_| BookingError::Validation("status must be booked, confirmed, completed or cancelled".into()))?;

        let existing = self.find_appointment(appointment_id).await?;
        let doctor_id = self.doctor_id_for(requester_id, requester_role).await?;
        if existing.doctor_id != doctor_id {
            return Err(BookingError::Forbidden(
                "Doctor can only update their own appointments".into(),
            ));
        }

        self.store.update_appointment_status(appointment_id, status).await?;

        info!(
            "appointment {appointment_id} status {} -> {}",
            existing.status.as_str(),
            status.as_str()
        );
        self.reload(appointment_id).await
    }

    pub async fn list_for_patient(&self, patient_id: i64) -> Result<Vec<Appointment>, BookingError> {
        Ok(self.store.list_by_patient(patient_id).await?)
    }

    pub async fn list_for_doctor(&self, requester_id: i64, requester_role: Role) -> Result<Vec<Appointment>, BookingError> {
        let doctor_id = self.doctor_id_for(requester_id, requester_role).await?;
        Ok(self.store.list_by_doctor(doctor_id).await?)
    }

    fn check_bookable(&self, date: &str, time: &str, action: &'static str) -> Result<(), BookingError> {
        let (today, now) = self.clock.today_and_now();
        if clock::is_past(date, time, &today, &now) {
            return Err(BookingError::PastTime(action));
        }
        if let Some(reason) = self.schedule.blackout_reason(time) {
            return Err(BookingError::Blackout(reason));
        }
        Ok(())
    }

    async fn find_appointment(&self, appointment_id: i64) -> Result<Appointment, BookingError> {
        if appointment_id <= 0 {
            return Err(BookingError::Validation("Appointment id required".into()));
        }
        self.store
            .find_appointment_by_id(appointment_id)
            .await?
            .ok_or_else(|| BookingError::NotFound("Appointment not found".into()))
    }

    /// Admins act on any appointment; everyone else only on their own.
    async fn owned_appointment(
        &self,
        appointment_id: i64,
        requester_id: i64,
        requester_role: Role,
        action: &str,
    ) -> Result<Appointment, BookingError> {
        let appointment = self.find_appointment(appointment_id).await?;
        if requester_role != Role::Admin && appointment.patient_id != requester_id {
            return Err(BookingError::Forbidden(format!(
                "You cannot {action} this appointment"
            )));
        }
        Ok(appointment)
    }

    async fn doctor_id_for(&self, user_id: i64, role: Role) -> Result<i64, BookingError> {
        if role != Role::Doctor {
            return Err(BookingError::Forbidden("Doctors only".into()));
        }
        self.store
            .find_doctor_by_user_id(user_id)
            .await?
            .map(|d| d.id)
            .ok_or_else(|| BookingError::NotFound("Doctor account has no doctor profile".into()))
    }

    async fn reload(&self, appointment_id: i64) -> Result<Appointment, BookingError> {
        self.store
            .find_appointment_by_id(appointment_id)
            .await?
            .ok_or_else(|| BookingError::Storage(format!("appointment {appointment_id} vanished after write")))
    }
}
