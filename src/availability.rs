// src/availability.rs

use std::collections::HashSet;

use tracing::debug;

use crate::clock::{self, Clock};
use crate::error::BookingError;
use crate::models::{BookedSlot, Slot};
use crate::schedule::{Period, ScheduleConfig};
use crate::store::AppointmentStore;

/// Annotates the day's grid. First matching reason wins: past, then blackout, then booked.
pub fn annotate_day(
    schedule: &ScheduleConfig,
    date: &str,
    today: &str,
    now: &str,
    booked: &[BookedSlot],
) -> Vec<Slot> {
    let taken: HashSet<&str> = booked
        .iter()
        .filter(|b| b.status.is_live())
        .map(|b| b.time.as_str())
        .collect();

    schedule
        .grid()
        .into_iter()
        .map(|time| {
            // future dates are never past
            let reason = if date == today && time.as_str() <= now {
                "Past time"
            } else if let Some(blackout) = schedule.blackout_reason(&time) {
                blackout
            } else if taken.contains(time.as_str()) {
                "Booked"
            } else {
                ""
            };

            Slot {
                period: Period::of(&time),
                available: reason.is_empty(),
                reason: reason.to_string(),
                time,
            }
        })
        .collect()
}

/// Slot list for one doctor and day, read from storage in a single query.
pub async fn resolve_day(
    store: &dyn AppointmentStore,
    clock: &dyn Clock,
    schedule: &ScheduleConfig,
    doctor_id: i64,
    date: &str,
) -> Result<Vec<Slot>, BookingError> {
    if doctor_id <= 0 || !clock::is_iso_date(date) {
        return Err(BookingError::Validation(
            "doctorId and date=YYYY-MM-DD are required".into(),
        ));
    }

    let booked = store.list_appointments(doctor_id, date).await?;
    debug!(
        "doctor {doctor_id} on {date}: {} appointment rows ({:?})",
        booked.len(),
        booked.iter().map(|b| b.id).collect::<Vec<_>>()
    );

    let (today, now) = clock.today_and_now();
    Ok(annotate_day(schedule, date, &today, &now, &booked))
}
