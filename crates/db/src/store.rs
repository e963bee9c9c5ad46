//! Postgres implementations of the core storage traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fieldbook_core::{
    directory::FieldDirectory,
    errors::{BookingError, BookingResult},
    ledger::BookingStore,
    models::{
        booking::{Booking, BookingFilter, NewBooking},
        field::{Field, Sport},
    },
};

use crate::{
    repositories::{booking, field},
    DbPool,
};

/// Reads fields and sports owned by the catalogue tables.
#[derive(Debug, Clone)]
pub struct PgFieldDirectory {
    pool: DbPool,
}

impl PgFieldDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FieldDirectory for PgFieldDirectory {
    async fn get_field(&self, id: i64) -> BookingResult<Option<Field>> {
        Ok(field::get_field_by_id(&self.pool, id).await?.map(Field::from))
    }

    async fn get_sport(&self, id: i64) -> BookingResult<Option<Sport>> {
        Ok(field::get_sport_by_id(&self.pool, id).await?.map(Sport::from))
    }
}

#[derive(Debug, Clone)]
pub struct PgBookingStore {
    pool: DbPool,
}

impl PgBookingStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn insert(&self, new_booking: NewBooking) -> BookingResult<Booking> {
        booking::insert_booking(&self.pool, &new_booking).await?.try_into()
    }

    async fn get(&self, id: i64) -> BookingResult<Option<Booking>> {
        booking::get_booking_by_id(&self.pool, id)
            .await?
            .map(Booking::try_from)
            .transpose()
    }

    async fn list(&self, filter: &BookingFilter) -> BookingResult<Vec<Booking>> {
        booking::list_bookings(
            &self.pool,
            filter.field_id,
            filter.booking_date,
            filter.status.as_ref().map(|status| status.as_str()),
        )
        .await?
        .into_iter()
        .map(Booking::try_from)
        .collect()
    }

    async fn mark_cancelled(&self, id: i64, at: DateTime<Utc>) -> BookingResult<Booking> {
        if let Some(row) = booking::cancel_booking(&self.pool, id, at).await? {
            return row.try_into();
        }

        // Nothing updated: tell a missing booking apart from a cancelled one.
        match booking::get_booking_by_id(&self.pool, id).await? {
            Some(_) => Err(BookingError::AlreadyCancelled(id)),
            None => Err(BookingError::NotFound(format!("Booking with ID {} not found", id))),
        }
    }
}
