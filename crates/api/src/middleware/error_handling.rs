//! # Error Handling Middleware
//!
//! Maps [`BookingError`] onto HTTP status codes and JSON error bodies so every
//! handler reports failures the same way.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use fieldbook_core::errors::BookingError;
use serde_json::json;
use tracing::error;

/// Seconds a client should wait before retrying after a lock timeout.
pub const RETRY_AFTER_SECONDS: u64 = 1;

/// Application error wrapper that provides HTTP status code mapping
///
/// # Example
///
/// ```
/// use axum::Json;
/// use fieldbook_api::middleware::error_handling::AppError;
/// use fieldbook_core::errors::BookingError;
///
/// async fn handler(id: i64) -> Result<Json<i64>, AppError> {
///     if id <= 0 {
///         return Err(BookingError::Validation("id must be positive".into()).into());
///     }
///     Ok(Json(id))
/// }
/// # fn main() {}
/// ```
#[derive(Debug)]
pub struct AppError(pub BookingError);

impl AppError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            BookingError::Validation(_)
            | BookingError::MalformedSlot(_)
            | BookingError::OverlappingSlotsInRequest { .. } => StatusCode::BAD_REQUEST,
            BookingError::FieldNotFound(_) | BookingError::NotFound(_) => StatusCode::NOT_FOUND,
            BookingError::FieldUnavailable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            BookingError::SlotConflict { .. } | BookingError::AlreadyCancelled(_) => StatusCode::CONFLICT,
            BookingError::StorageTimeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
            BookingError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() && !self.0.is_retryable() {
            error!("Request failed: {:?}", self.0);
        }

        let message = self.0.to_string();
        let body = match &self.0 {
            BookingError::SlotConflict { conflicting } => {
                json!({ "error": message, "conflicting_slots": conflicting })
            }
            _ => json!({ "error": message }),
        };

        if self.0.is_retryable() {
            let retry_after = [(header::RETRY_AFTER, RETRY_AFTER_SECONDS.to_string())];
            return (status, retry_after, Json(body)).into_response();
        }

        (status, Json(body)).into_response()
    }
}

/// Lets handlers use `?` on `BookingResult` values.
impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        AppError(err)
    }
}

impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        AppError(BookingError::Storage(err))
    }
}

pub fn map_error(err: BookingError) -> Response {
    AppError(err).into_response()
}
