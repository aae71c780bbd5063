// src/routes/slot_routes.rs

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::{
    error::{ApiError, BookingError},
    middleware::auth_context::AuthContext,
    models::{AppState, Slot},
};

pub fn router() -> Router<AppState> {
    Router::new().route("/slots", get(slots_for_day))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotsQuery {
    // kept as text so a malformed id gets our 400 body, not the extractor's
    pub doctor_id: Option<String>,
    pub date: Option<String>,
}

/* ============================================================
   GET /slots?doctorId=<int>&date=YYYY-MM-DD
   ============================================================ */

pub async fn slots_for_day(
    State(state): State<AppState>,
    _auth: AuthContext,
    Query(q): Query<SlotsQuery>,
) -> Result<Json<Vec<Slot>>, ApiError> {
    let doctor_id = q
        .doctor_id
        .as_deref()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .ok_or_else(|| BookingError::Validation("doctorId and date=YYYY-MM-DD are required".into()))?;
    let date = q.date.unwrap_or_default();

    let slots = state.booking.slots_for_day(doctor_id, &date).await?;
    Ok(Json(slots))
}
