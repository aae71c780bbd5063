use axum::{Json, Router, routing::get};
use chrono::{DateTime, Utc};

use crate::models::AppState;

#[derive(serde::Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub ts: DateTime<Utc>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        ts: Utc::now(),
    })
}
