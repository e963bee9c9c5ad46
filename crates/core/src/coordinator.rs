//! # Reservation Coordinator
//!
//! The only way to create or cancel a booking. Creation runs:
//!
//! 1. shape validation of the raw request
//! 2. field lookup in the [`FieldDirectory`]
//! 3. slot parsing and normalization
//! 4. conflict check and reservation in the [`ConflictIndex`]
//! 5. persistence in the [`Ledger`]
//!
//! Steps 4 and 5 run while holding the `(field_id, booking_date)` key lock,
//! so no other request can commit on that key in between. If step 5 fails
//! the reservation from step 4 is released before the lock is dropped.
//!
//! Once slots are reserved, persistence and its compensation run on a spawned
//! task that owns the key lock. Dropping the caller's future (client gone,
//! request timeout) detaches from that task but never interrupts it, so the
//! index and the store always settle to the same state.

use std::sync::Arc;

use chrono::NaiveDate;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::{
    config::ReservationConfig,
    conflict_index::{ConflictIndex, SlotKey},
    directory::FieldDirectory,
    errors::{BookingError, BookingResult},
    ledger::{BookingStore, Ledger},
    models::booking::{Booking, BookingFilter, BookingStatus, CreateBookingRequest, NewBooking},
    slot::{Slot, SlotSet},
};

pub struct ReservationCoordinator {
    directory: Arc<dyn FieldDirectory>,
    ledger: Ledger,
    index: ConflictIndex,
    config: ReservationConfig,
}

impl ReservationCoordinator {
    pub fn new(
        directory: Arc<dyn FieldDirectory>,
        store: Arc<dyn BookingStore>,
        config: ReservationConfig,
    ) -> Self {
        Self {
            directory,
            ledger: Ledger::new(store, config.price_policy),
            index: ConflictIndex::new(config.lock_timeout),
            config,
        }
    }

    /// Rebuilds the conflict index from the confirmed bookings in the store.
    /// Call once at startup, before serving requests.
    pub async fn hydrate(&self) -> BookingResult<usize> {
        let confirmed = self
            .ledger
            .list(&BookingFilter {
                status: Some(BookingStatus::Confirmed),
                ..Default::default()
            })
            .await?;

        let loaded = self.index.hydrate(&confirmed).await?;
        info!(bookings = loaded, keys = self.index.key_count(), "Conflict index hydrated");
        Ok(loaded)
    }

    pub async fn create_booking(&self, request: CreateBookingRequest) -> BookingResult<Booking> {
        let request = request.validate()?;

        let field = self
            .directory
            .get_field(request.field_id)
            .await?
            .ok_or(BookingError::FieldNotFound(request.field_id))?;
        if !field.is_available {
            return Err(BookingError::FieldUnavailable(field.id));
        }
        if let Some(sport) = self.directory.get_sport(field.sport_id).await? {
            if !sport.is_available {
                return Err(BookingError::FieldUnavailable(field.id));
            }
        }

        let slots = SlotSet::parse_all(&request.time_slots, self.config.operating_hours.as_ref())?;
        let total_price = self.ledger.settle_price(&field, &slots, request.client_price)?;

        let key = SlotKey::new(field.id, request.booking_date);
        let mut guard = self.index.lock(key).await?;
        let reservation_token = guard.try_reserve(&slots)?;

        let new_booking = NewBooking {
            field_id: field.id,
            field_name: field.field_name,
            booking_date: request.booking_date,
            time_slots: slots.clone(),
            total_price,
            customer: request.customer,
            reservation_token,
        };

        let ledger = self.ledger.clone();
        let commit = tokio::spawn(async move {
            match ledger.record(new_booking).await {
                Ok(booking) => {
                    info!(
                        booking_id = booking.id,
                        field_id = booking.field_id,
                        booking_date = %booking.booking_date,
                        slots = booking.time_slots.len(),
                        total_price = %booking.total_price,
                        "Booking confirmed"
                    );
                    Ok(booking)
                }
                Err(err) => {
                    let released = guard.release(&slots, reservation_token);
                    error!(
                        field_id = key.field_id,
                        booking_date = %key.booking_date,
                        released,
                        error = %err,
                        "Failed to persist booking; reservation rolled back"
                    );
                    Err(err)
                }
            }
        });

        join_critical(commit).await
    }

    /// Cancels a confirmed booking and frees its slots. A second call
    /// returns [`BookingError::AlreadyCancelled`] and releases nothing.
    pub async fn cancel_booking(&self, id: i64) -> BookingResult<Booking> {
        let booking = self.ledger.get(id).await?;
        let mut guard = self.index.lock(booking.slot_key()).await?;

        // Re-read under the key lock; a concurrent cancel may have won.
        let booking = self.ledger.get(id).await?;

        let ledger = self.ledger.clone();
        let commit = tokio::spawn(async move {
            let cancelled = ledger.cancel(&booking).await?;
            let released = guard.release(&cancelled.time_slots, cancelled.reservation_token);

            info!(
                booking_id = cancelled.id,
                field_id = cancelled.field_id,
                booking_date = %cancelled.booking_date,
                released,
                "Booking cancelled"
            );
            Ok(cancelled)
        });

        join_critical(commit).await
    }

    pub async fn get_booking(&self, id: i64) -> BookingResult<Booking> {
        self.ledger.get(id).await
    }

    pub async fn list_bookings(&self, filter: &BookingFilter) -> BookingResult<Vec<Booking>> {
        self.ledger.list(filter).await
    }

    /// Slots already taken on a field for a date.
    pub async fn booked_slots(&self, field_id: i64, booking_date: NaiveDate) -> BookingResult<Vec<Slot>> {
        self.index.occupied(SlotKey::new(field_id, booking_date)).await
    }

    pub fn config(&self) -> &ReservationConfig {
        &self.config
    }
}

/// Awaits a spawned store-and-index step. The step keeps running if this
/// future is dropped.
async fn join_critical(task: JoinHandle<BookingResult<Booking>>) -> BookingResult<Booking> {
    task.await.map_err(|e| {
        BookingError::Storage(eyre::eyre!("Booking task did not complete: {}", e))
    })?
}
