//! # Booking Ledger
//!
//! Booking storage behind the [`BookingStore`] trait, plus the rules the
//! store does not know about: price authority and the status machine
//! `confirmed -> cancelled`.

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use tokio::sync::RwLock;

use crate::{
    config::PricePolicy,
    errors::{BookingError, BookingResult},
    models::{
        booking::{Booking, BookingFilter, BookingStatus, NewBooking},
        field::Field,
    },
    slot::SlotSet,
};

/// Persistence for bookings.
///
/// Implementations assign ids that are never reused and return listings in
/// ascending id order.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Stores a booking as `confirmed`.
    async fn insert(&self, booking: NewBooking) -> BookingResult<Booking>;

    async fn get(&self, id: i64) -> BookingResult<Option<Booking>>;

    async fn list(&self, filter: &BookingFilter) -> BookingResult<Vec<Booking>>;

    /// Moves a confirmed booking to `cancelled`. Fails with `NotFound` or
    /// `AlreadyCancelled` without modifying anything.
    async fn mark_cancelled(&self, id: i64, at: DateTime<Utc>) -> BookingResult<Booking>;
}

#[derive(Debug, Default)]
pub struct InMemoryBookingStore {
    next_id: AtomicI64,
    bookings: RwLock<BTreeMap<i64, Booking>>,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn insert(&self, booking: NewBooking) -> BookingResult<Booking> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let booking = Booking {
            id,
            field_id: booking.field_id,
            field_name: booking.field_name,
            booking_date: booking.booking_date,
            time_slots: booking.time_slots,
            total_price: booking.total_price,
            customer_name: booking.customer.name,
            customer_phone: booking.customer.phone,
            customer_email: booking.customer.email,
            status: BookingStatus::Confirmed,
            reservation_token: booking.reservation_token,
            created_at: Utc::now(),
            cancelled_at: None,
        };

        self.bookings.write().await.insert(id, booking.clone());
        Ok(booking)
    }

    async fn get(&self, id: i64) -> BookingResult<Option<Booking>> {
        Ok(self.bookings.read().await.get(&id).cloned())
    }

    async fn list(&self, filter: &BookingFilter) -> BookingResult<Vec<Booking>> {
        Ok(self
            .bookings
            .read()
            .await
            .values()
            .filter(|booking| filter.matches(booking))
            .cloned()
            .collect())
    }

    async fn mark_cancelled(&self, id: i64, at: DateTime<Utc>) -> BookingResult<Booking> {
        let mut bookings = self.bookings.write().await;
        let booking = bookings
            .get_mut(&id)
            .ok_or_else(|| BookingError::NotFound(format!("Booking with ID {} not found", id)))?;

        if booking.status == BookingStatus::Cancelled {
            return Err(BookingError::AlreadyCancelled(id));
        }

        booking.status = BookingStatus::Cancelled;
        booking.cancelled_at = Some(at);
        Ok(booking.clone())
    }
}

/// Price of `slots` at `price_per_hour`, rounded half away from zero to cents.
///
/// The multiplication happens before dividing by 60, so whole-minute slots
/// only round once.
pub fn quote(price_per_hour: Decimal, slots: &SlotSet) -> Decimal {
    (price_per_hour * Decimal::from(slots.total_minutes()) / Decimal::from(60))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn BookingStore>,
    price_policy: PricePolicy,
}

impl Ledger {
    pub fn new(store: Arc<dyn BookingStore>, price_policy: PricePolicy) -> Self {
        Self {
            store,
            price_policy,
        }
    }

    /// Server-side price for a booking. Under [`PricePolicy::Strict`] a
    /// client price that differs is a validation error.
    pub fn settle_price(&self, field: &Field, slots: &SlotSet, client_price: Option<Decimal>) -> BookingResult<Decimal> {
        let price = quote(field.price_per_hour, slots);

        if let (PricePolicy::Strict, Some(client)) = (self.price_policy, client_price) {
            if client != price {
                return Err(BookingError::Validation(format!(
                    "total_price {} does not match computed price {}",
                    client, price
                )));
            }
        }

        Ok(price)
    }

    pub async fn record(&self, booking: NewBooking) -> BookingResult<Booking> {
        self.store.insert(booking).await
    }

    pub async fn get(&self, id: i64) -> BookingResult<Booking> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("Booking with ID {} not found", id)))
    }

    pub async fn list(&self, filter: &BookingFilter) -> BookingResult<Vec<Booking>> {
        self.store.list(filter).await
    }

    /// `confirmed -> cancelled`. Cancelled is terminal.
    pub async fn cancel(&self, booking: &Booking) -> BookingResult<Booking> {
        if booking.status == BookingStatus::Cancelled {
            return Err(BookingError::AlreadyCancelled(booking.id));
        }
        self.store.mark_cancelled(booking.id, Utc::now()).await
    }
}
