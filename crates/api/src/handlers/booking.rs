use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use fieldbook_core::{
    errors::BookingError,
    models::booking::{AvailabilityResponse, Booking, BookingFilter, BookingStatus, CreateBookingRequest},
};
use serde::Deserialize;

use crate::{middleware::error_handling::AppError, ApiState};

/// Query string of the listing endpoint. Values are kept raw so that a bad
/// value surfaces as a JSON validation error instead of an extractor rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingQuery {
    pub field_id: Option<String>,
    pub date: Option<String>,
    pub status: Option<String>,
}

impl BookingQuery {
    pub fn into_filter(self) -> Result<BookingFilter, BookingError> {
        Ok(BookingFilter {
            field_id: present(&self.field_id).map(parse_field_id).transpose()?,
            booking_date: present(&self.date).map(parse_date).transpose()?,
            status: present(&self.status).map(str::parse::<BookingStatus>).transpose()?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    pub field_id: Option<String>,
    pub date: Option<String>,
}

/// An empty query value (`?fieldId=`) counts as not given.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_field_id(raw: &str) -> Result<i64, BookingError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| BookingError::Validation(format!("Invalid field id '{}'", raw)))
}

fn parse_date(raw: &str) -> Result<NaiveDate, BookingError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        BookingError::Validation(format!("Invalid date '{}', expected YYYY-MM-DD", raw))
    })
}

fn parse_booking_id(raw: &str) -> Result<i64, BookingError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| BookingError::NotFound(format!("Booking with ID {} not found", raw)))
}

#[axum::debug_handler]
pub async fn create_booking(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let Json(payload) = payload
        .map_err(|rejection| BookingError::Validation(format!("Invalid request body: {}", rejection.body_text())))?;

    let request: CreateBookingRequest = serde_json::from_value(payload)
        .map_err(|e| BookingError::Validation(format!("Invalid request body: {}", e)))?;

    let booking = state.coordinator.create_booking(request).await?;

    Ok((StatusCode::CREATED, Json(booking)))
}

#[axum::debug_handler]
pub async fn list_bookings(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<BookingQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let filter = query.into_filter()?;
    let bookings = state.coordinator.list_bookings(&filter).await?;

    Ok(Json(bookings))
}

#[axum::debug_handler]
pub async fn get_booking(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let id = parse_booking_id(&id)?;
    let booking = state.coordinator.get_booking(id).await?;

    Ok(Json(booking))
}

#[axum::debug_handler]
pub async fn cancel_booking(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_booking_id(&id)?;
    state.coordinator.cancel_booking(id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn check_availability(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let (Some(field_id), Some(date)) = (present(&query.field_id), present(&query.date)) else {
        return Err(BookingError::Validation("Missing required parameters: fieldId, date".to_string()).into());
    };

    let booked_slots = state
        .coordinator
        .booked_slots(parse_field_id(field_id)?, parse_date(date)?)
        .await?;

    Ok(Json(AvailabilityResponse { booked_slots }))
}
