// src/routes/appointment_routes.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;

use crate::{
    error::{ApiError, BookingError},
    middleware::auth_context::AuthContext,
    models::{AppState, Appointment, AppointmentActionResponse},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/appointments/book", post(book_appointment))
        .route("/appointments/mine", get(list_mine))
        .route("/appointments/doctor", get(list_doctor_queue))
        .route("/appointments/{appointment_id}/cancel", post(cancel_appointment))
        .route("/appointments/{appointment_id}/reschedule", post(reschedule_appointment))
        .route("/appointments/{appointment_id}/status", post(update_status))
}

fn parse_appointment_id(raw: &str) -> Result<i64, ApiError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| BookingError::Validation("Appointment id required".into()).into())
}

/* ============================================================
   POST /appointments/book
   ============================================================ */

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookRequest {
    pub doctor_id: Option<i64>,
    /// Defaults to the caller.
    pub patient_id: Option<i64>,
    pub date: Option<String>,
    pub time: Option<String>,
}

pub async fn book_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    WithRejection(Json(req), _): WithRejection<Json<BookRequest>, ApiError>,
) -> Result<(StatusCode, Json<Appointment>), ApiError> {
    tracing::debug!(
        "book request from user {} (session {})",
        auth.user_id,
        auth.session_token_id
    );

    let saved = state
        .booking
        .book(
            req.doctor_id.unwrap_or(0),
            req.patient_id.unwrap_or(auth.user_id),
            req.date.as_deref().unwrap_or_default(),
            req.time.as_deref().unwrap_or_default(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(saved)))
}

/* ============================================================
   GET /appointments/mine, GET /appointments/doctor
   ============================================================ */

pub async fn list_mine(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    Ok(Json(state.booking.list_for_patient(auth.user_id).await?))
}

pub async fn list_doctor_queue(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    Ok(Json(state.booking.list_for_doctor(auth.user_id, auth.role).await?))
}

/* ============================================================
   POST /appointments/{id}/cancel
   ============================================================ */

pub async fn cancel_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(appointment_id): Path<String>,
) -> Result<Json<AppointmentActionResponse>, ApiError> {
    let id = parse_appointment_id(&appointment_id)?;
    let outcome = state.booking.cancel(id, auth.user_id, auth.role).await?;

    let message = if outcome.already_cancelled {
        "Already cancelled"
    } else {
        "Appointment cancelled"
    };
    Ok(Json(AppointmentActionResponse {
        ok: true,
        message: message.into(),
        appointment: outcome.appointment,
    }))
}

/* ============================================================
   POST /appointments/{id}/reschedule
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct RescheduleRequest {
    pub date: Option<String>,
    pub time: Option<String>,
}

pub async fn reschedule_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(appointment_id): Path<String>,
    WithRejection(Json(req), _): WithRejection<Json<RescheduleRequest>, ApiError>,
) -> Result<Json<AppointmentActionResponse>, ApiError> {
    let id = parse_appointment_id(&appointment_id)?;
    let updated = state
        .booking
        .reschedule(
            id,
            auth.user_id,
            auth.role,
            req.date.as_deref().unwrap_or_default(),
            req.time.as_deref().unwrap_or_default(),
        )
        .await?;

    Ok(Json(AppointmentActionResponse {
        ok: true,
        message: "Appointment rescheduled".into(),
        appointment: updated,
    }))
}

/* ============================================================
   POST /appointments/{id}/status  (doctor only)
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: Option<String>,
}

pub async fn update_status(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(appointment_id): Path<String>,
    WithRejection(Json(req), _): WithRejection<Json<StatusRequest>, ApiError>,
) -> Result<Json<AppointmentActionResponse>, ApiError> {
    let id = parse_appointment_id(&appointment_id)?;
    let updated = state
        .booking
        .update_status(id, auth.user_id, auth.role, req.status.as_deref().unwrap_or_default())
        .await?;

    Ok(Json(AppointmentActionResponse {
        ok: true,
        message: format!("Status updated to {}", updated.status.as_str()),
        appointment: updated,
    }))
}
