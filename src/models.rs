use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::booking::BookingService;
use crate::schedule::Period;
use crate::store::AppointmentStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AppointmentStore>,
    pub booking: BookingService,
}

/* -------------------------
   Domain enums
--------------------------*/

/// Account role as stored in `users.role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
    Admin,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "patient" => Ok(Role::Patient),
            "doctor" => Ok(Role::Doctor),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Booked,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Booked => "booked",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    /// Live appointments hold their slot; cancelled and completed ones do not.
    pub fn is_live(&self) -> bool {
        matches!(self, AppointmentStatus::Booked | AppointmentStatus::Confirmed)
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "booked" => Ok(AppointmentStatus::Booked),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            other => Err(format!("unknown appointment status: {other}")),
        }
    }
}

/* -------------------------
   Rows
--------------------------*/

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: i64,
    pub user_id: Option<i64>,
    pub name: String,
    pub city: Option<String>,
    pub fee: Option<f64>,
    pub specialty: Option<String>,
}

/// An appointment joined with the doctor's display fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: i64,
    pub doctor_id: i64,
    pub patient_id: i64,
    pub date: String,
    pub time: String,
    pub status: AppointmentStatus,
    pub doctor_name: Option<String>,
    pub city: Option<String>,
    pub fee: Option<f64>,
    pub specialty: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The slice of an appointment the slot resolver needs.
#[derive(Debug, Clone)]
pub struct BookedSlot {
    pub id: i64,
    pub time: String,
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub doctor_id: i64,
    pub patient_id: i64,
    pub date: String,
    pub time: String,
    pub status: AppointmentStatus,
}

/// Authenticated session as resolved from `session_tokens`.
#[derive(Debug, Clone)]
pub struct SessionRow {
    pub session_token_id: uuid::Uuid,
    pub user_id: i64,
    pub role: Role,
}

/* -------------------------
   API DTOs
--------------------------*/

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slot {
    pub time: String,
    pub available: bool,
    pub reason: String,
    pub period: Period,
}

#[derive(Debug, Serialize)]
pub struct AppointmentActionResponse {
    pub ok: bool,
    pub message: String,
    pub appointment: Appointment,
}
