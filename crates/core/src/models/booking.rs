use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    conflict_index::{ReservationToken, SlotKey},
    errors::{BookingError, BookingResult},
    slot::{Slot, SlotSet},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = BookingError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(BookingError::Validation(format!(
                "Unknown booking status '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub field_id: i64,
    pub field_name: String,
    pub booking_date: NaiveDate,
    pub time_slots: SlotSet,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: String,
    pub status: BookingStatus,
    #[serde(skip)]
    pub reservation_token: ReservationToken,
    pub created_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Booking {
    pub fn slot_key(&self) -> SlotKey {
        SlotKey::new(self.field_id, self.booking_date)
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == BookingStatus::Confirmed
    }
}

/// A booking that has been granted its slots but not yet stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub field_id: i64,
    pub field_name: String,
    pub booking_date: NaiveDate,
    pub time_slots: SlotSet,
    pub total_price: Decimal,
    pub customer: Customer,
    pub reservation_token: ReservationToken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    pub name: String,
    pub phone: String,
    pub email: String,
}

/// Booking payload as submitted by a client.
///
/// Every field is optional here so that a missing or mistyped value turns
/// into a [`BookingError::Validation`] from [`CreateBookingRequest::validate`]
/// rather than a deserialization failure. `field_id` accepts a number or a
/// numeric string. `field_name` is accepted for compatibility and ignored;
/// the stored name always comes from the field directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateBookingRequest {
    pub field_id: Option<Value>,
    pub field_name: Option<String>,
    pub booking_date: Option<String>,
    pub time_slots: Option<Vec<String>>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub total_price: Option<Decimal>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
}

/// A request that passed shape validation. Slots are still raw strings;
/// they are parsed once the field is known.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingRequest {
    pub field_id: i64,
    pub booking_date: NaiveDate,
    pub time_slots: Vec<String>,
    pub client_price: Option<Decimal>,
    pub customer: Customer,
}

impl CreateBookingRequest {
    pub fn validate(self) -> BookingResult<BookingRequest> {
        let mut missing = Vec::new();

        let field_id = match &self.field_id {
            None | Some(Value::Null) => {
                missing.push("field_id");
                None
            }
            Some(value) => Some(parse_field_id(value)?),
        };

        let booking_date = required(self.booking_date, "booking_date", &mut missing);
        let time_slots = match self.time_slots {
            Some(slots) if !slots.is_empty() => Some(slots),
            _ => {
                missing.push("time_slots");
                None
            }
        };
        let name = required(self.customer_name, "customer_name", &mut missing);
        let phone = required(self.customer_phone, "customer_phone", &mut missing);
        let email = required(self.customer_email, "customer_email", &mut missing);

        if !missing.is_empty() {
            return Err(BookingError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        let (Some(field_id), Some(booking_date), Some(time_slots), Some(name), Some(phone), Some(email)) =
            (field_id, booking_date, time_slots, name, phone, email)
        else {
            return Err(BookingError::Validation("Missing required fields".to_string()));
        };

        let booking_date = NaiveDate::parse_from_str(&booking_date, "%Y-%m-%d").map_err(|_| {
            BookingError::Validation(format!(
                "Invalid booking_date '{}', expected YYYY-MM-DD",
                booking_date
            ))
        })?;

        if let Some(price) = self.total_price {
            if price.is_sign_negative() {
                return Err(BookingError::Validation(
                    "total_price must not be negative".to_string(),
                ));
            }
        }

        Ok(BookingRequest {
            field_id,
            booking_date,
            time_slots,
            client_price: self.total_price,
            customer: Customer { name, phone, email },
        })
    }
}

/// Returns the trimmed value, recording `name` as missing when absent or blank.
fn required(value: Option<String>, name: &'static str, missing: &mut Vec<&'static str>) -> Option<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Some(v),
        _ => {
            missing.push(name);
            None
        }
    }
}

fn parse_field_id(value: &Value) -> BookingResult<i64> {
    let id = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };

    match id {
        Some(id) if id > 0 => Ok(id),
        _ => Err(BookingError::Validation(
            "Invalid field_id. Must be a positive integer.".to_string(),
        )),
    }
}

/// Conjunction of optional predicates; an empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingFilter {
    pub field_id: Option<i64>,
    pub booking_date: Option<NaiveDate>,
    pub status: Option<BookingStatus>,
}

impl BookingFilter {
    pub fn matches(&self, booking: &Booking) -> bool {
        self.field_id.is_none_or(|id| booking.field_id == id)
            && self.booking_date.is_none_or(|date| booking.booking_date == date)
            && self.status.is_none_or(|status| booking.status == status)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    #[serde(rename = "bookedSlots")]
    pub booked_slots: Vec<Slot>,
}
