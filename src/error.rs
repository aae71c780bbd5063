use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::store::StoreError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorObject,
}

#[derive(Debug, Serialize)]
pub struct ErrorObject {
    pub code: String,
    pub message: String,
}

/// Why a slot, booking, reschedule or cancellation request was refused.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    /// Carries the attempted action, e.g. "book" or "reschedule to".
    #[error("Cannot {0} a past time")]
    PastTime(&'static str),
    #[error("That time is not available ({0})")]
    Blackout(&'static str),
    #[error("That time is already booked")]
    Conflict,
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<StoreError> for BookingError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UniqueViolation => BookingError::Conflict,
            // the doctor is checked before every insert, so this is the patient
            StoreError::MissingReference => BookingError::NotFound("Patient not found".into()),
            StoreError::Unavailable(msg) => BookingError::StorageUnavailable(msg),
            StoreError::Database(msg) => BookingError::Storage(msg),
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(&'static str, String),
    Forbidden(&'static str, String),
    BadRequest(&'static str, String),
    NotFound(&'static str, String),
    Conflict(&'static str, String),
    Unavailable(&'static str, String),
    Internal(String),
}

impl ApiError {
    pub fn session_expired() -> Self {
        ApiError::Unauthorized("SESSION_EXPIRED", "Session expired".into())
    }

    fn to_error_response(code: &str, message: &str) -> Json<ErrorResponse> {
        Json(ErrorResponse {
            error: ErrorObject {
                code: code.to_string(),
                message: message.to_string(),
            },
        })
    }
}

impl From<BookingError> for ApiError {
    fn from(e: BookingError) -> Self {
        let msg = e.to_string();
        match e {
            BookingError::Validation(_) => ApiError::BadRequest("VALIDATION_ERROR", msg),
            BookingError::PastTime(_) => ApiError::BadRequest("PAST_TIME", msg),
            BookingError::NotFound(_) => ApiError::NotFound("NOT_FOUND", msg),
            BookingError::Forbidden(_) => ApiError::Forbidden("FORBIDDEN", msg),
            BookingError::Blackout(_) => ApiError::Conflict("BLACKOUT", msg),
            BookingError::Conflict => ApiError::Conflict("CONFLICT", msg),
            BookingError::StorageUnavailable(_) => ApiError::Unavailable(
                "STORAGE_UNAVAILABLE",
                "Service temporarily unavailable, please retry".into(),
            ),
            BookingError::Storage(_) => ApiError::Internal(msg),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        BookingError::from(e).into()
    }
}

/// Malformed or mistyped request bodies are input errors like any other.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest("VALIDATION_ERROR", rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(code, msg) => {
                (StatusCode::UNAUTHORIZED, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::Forbidden(code, msg) => {
                (StatusCode::FORBIDDEN, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::BadRequest(code, msg) => {
                (StatusCode::BAD_REQUEST, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::NotFound(code, msg) => {
                (StatusCode::NOT_FOUND, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::Conflict(code, msg) => {
                (StatusCode::CONFLICT, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::Unavailable(code, msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiError::to_error_response(code, &msg),
            )
                .into_response(),
            ApiError::Internal(msg) => {
                tracing::error!("internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError::to_error_response("INTERNAL", "Server error"),
                )
                    .into_response()
            }
        }
    }
}
