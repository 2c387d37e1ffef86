//! Error types for web handlers.
//!
//! Bridges domain errors (`CoordinatorError`, `GeometryError`) into the
//! HTTP envelope `{ success, message, data, code }`, attaching the
//! stable `code` string and status per the external interface's error
//! table.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use cinema_core::{CoordinatorError, GeometryError};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Application error type for web handlers.
///
/// Implements Axum's `IntoResponse` so handlers can simply propagate
/// `CoordinatorError` (or any error convertible into it) with `?`.
///
/// # Examples
///
/// ```ignore
/// async fn handler() -> Result<Json<Cinema>, AppError> {
///     let cinema = coordinator.find_cinema(&slug).await?;
///     Ok(Json(cinema))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    code: &'static str,
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Construct directly from status/message/code, used by
    /// extractors and validation failures that have no domain error
    /// to wrap.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>, code: &'static str) -> Self {
        Self {
            status,
            message: message.into(),
            code,
            source: None,
        }
    }

    /// Attach an opaque source error for server-class logging.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// `400 VALIDATION_ERROR`.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, "VALIDATION_ERROR")
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// The HTTP response envelope shared by every endpoint (see external
/// interface section: `{ success, message, data, code }`).
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    /// Whether the request succeeded.
    pub success: bool,
    /// Human-readable message.
    pub message: String,
    /// Response payload, `null` on error.
    pub data: Option<T>,
    /// Stable machine-readable error code, `null` on success.
    pub code: Option<&'static str>,
}

impl<T: Serialize> Envelope<T> {
    /// Build a success envelope.
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            code: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(status = %self.status, code = %self.code, message = %self.message, error = %source, "internal error");
            } else {
                tracing::error!(status = %self.status, code = %self.code, message = %self.message, "internal error");
            }
        }

        let body: Envelope<Value> = Envelope {
            success: false,
            message: self.message,
            data: None,
            code: Some(self.code),
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<CoordinatorError> for AppError {
    fn from(err: CoordinatorError) -> Self {
        match err {
            CoordinatorError::CinemaNotFound => Self::new(StatusCode::NOT_FOUND, err.to_string(), "CINEMA_NOT_FOUND"),
            CoordinatorError::CinemaAlreadyExists => {
                Self::new(StatusCode::CONFLICT, err.to_string(), "CINEMA_EXISTS")
            }
            CoordinatorError::InvalidSeatPosition => {
                Self::new(StatusCode::BAD_REQUEST, err.to_string(), "INVALID_SEAT_POSITION")
            }
            CoordinatorError::SeatsAlreadyReserved(_) => {
                Self::new(StatusCode::CONFLICT, err.to_string(), "SEATS_RESERVED")
            }
            CoordinatorError::MinDistanceViolation(_) => {
                Self::new(StatusCode::BAD_REQUEST, err.to_string(), "MIN_DISTANCE_VIOLATION")
            }
            CoordinatorError::SeatsNotReserved => {
                Self::new(StatusCode::CONFLICT, err.to_string(), "SEATS_NOT_AVAILABLE")
            }
            CoordinatorError::Validation(_) => Self::new(StatusCode::BAD_REQUEST, err.to_string(), "VALIDATION_ERROR"),
            CoordinatorError::Internal(_) | CoordinatorError::CompensationFailed { .. } => {
                let message = err.to_string();
                tracing::error!(error = %message, "coordinator internal error");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error", "INTERNAL_ERROR")
            }
        }
    }
}

impl From<GeometryError> for AppError {
    fn from(err: GeometryError) -> Self {
        Self::new(StatusCode::BAD_REQUEST, err.to_string(), "VALIDATION_ERROR")
    }
}

/// Convert opaque `anyhow::Error` into `AppError`, mirroring the
/// coordinator-error path: exposed to clients as `UNKNOWN_ERROR`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "an internal error occurred", "UNKNOWN_ERROR").with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinema_core::SeatCoord;

    #[test]
    fn display_includes_code_and_message() {
        let err = AppError::validation("name too short");
        assert_eq!(err.to_string(), "[VALIDATION_ERROR] name too short");
    }

    #[test]
    fn cinema_not_found_maps_to_404() {
        let err: AppError = CoordinatorError::CinemaNotFound.into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.code, "CINEMA_NOT_FOUND");
    }

    #[test]
    fn seats_already_reserved_maps_to_409() {
        let err: AppError = CoordinatorError::SeatsAlreadyReserved(vec![SeatCoord::new(0, 0)]).into();
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.code, "SEATS_RESERVED");
    }

    #[test]
    fn min_distance_violation_maps_to_400() {
        let err: AppError = CoordinatorError::MinDistanceViolation(vec![SeatCoord::new(0, 1)]).into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "MIN_DISTANCE_VIOLATION");
    }

    #[test]
    fn internal_error_redacts_detail_from_client_message() {
        let err: AppError = CoordinatorError::Internal("connection refused".to_owned()).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code, "INTERNAL_ERROR");
        assert_eq!(err.message, "internal error");
    }
}
