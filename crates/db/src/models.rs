use chrono::{DateTime, NaiveDate, Utc};
use fieldbook_core::{
    conflict_index::ReservationToken,
    errors::BookingError,
    models::{
        booking::Booking,
        field::{Field, Sport},
    },
    slot::SlotSet,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbSport {
    pub id: i64,
    pub sport_name: String,
    pub sport_type: String,
    pub is_available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbField {
    pub id: i64,
    pub field_name: String,
    pub field_code: String,
    pub sport_id: i64,
    pub price_per_hour: Decimal,
    pub is_available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbBooking {
    pub id: i64,
    pub field_id: i64,
    pub field_name: String,
    pub booking_date: NaiveDate,
    pub time_slots: Vec<String>,
    pub total_price: Decimal,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: String,
    pub status: String,
    pub reservation_token: Uuid,
    pub created_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl From<DbSport> for Sport {
    fn from(row: DbSport) -> Self {
        Sport {
            id: row.id,
            sport_name: row.sport_name,
            sport_type: row.sport_type,
            is_available: row.is_available,
        }
    }
}

impl From<DbField> for Field {
    fn from(row: DbField) -> Self {
        Field {
            id: row.id,
            field_name: row.field_name,
            field_code: row.field_code,
            sport_id: row.sport_id,
            price_per_hour: row.price_per_hour,
            is_available: row.is_available,
        }
    }
}

impl TryFrom<DbBooking> for Booking {
    type Error = BookingError;

    fn try_from(row: DbBooking) -> Result<Self, Self::Error> {
        let time_slots = SlotSet::parse_all(&row.time_slots, None).map_err(|e| {
            BookingError::Storage(eyre::eyre!("Booking {} has corrupt time slots: {}", row.id, e))
        })?;
        let status = row.status.parse().map_err(|e| {
            BookingError::Storage(eyre::eyre!("Booking {} has corrupt status: {}", row.id, e))
        })?;

        Ok(Booking {
            id: row.id,
            field_id: row.field_id,
            field_name: row.field_name,
            booking_date: row.booking_date,
            time_slots,
            total_price: row.total_price,
            customer_name: row.customer_name,
            customer_phone: row.customer_phone,
            customer_email: row.customer_email,
            status,
            reservation_token: ReservationToken::from_uuid(row.reservation_token),
            created_at: row.created_at,
            cancelled_at: row.cancelled_at,
        })
    }
}
