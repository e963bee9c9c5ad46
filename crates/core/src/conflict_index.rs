//! # Conflict Index
//!
//! Occupied slots per `(field_id, booking_date)`. Each key owns its own
//! async mutex; reservations on different fields or dates never wait on
//! each other. Callers that must do more work while the key is held (the
//! coordinator persisting a booking) take a [`KeyGuard`] via
//! [`ConflictIndex::lock`] and reserve through it.
//!
//! Lock acquisition is bounded by the configured timeout and fails with
//! [`BookingError::StorageTimeout`], which callers may retry.

use std::{sync::Arc, time::Duration};

use chrono::NaiveDate;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    errors::{BookingError, BookingResult},
    models::booking::Booking,
    slot::{Slot, SlotSet},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotKey {
    pub field_id: i64,
    pub booking_date: NaiveDate,
}

impl SlotKey {
    pub fn new(field_id: i64, booking_date: NaiveDate) -> Self {
        Self {
            field_id,
            booking_date,
        }
    }
}

/// Proof of a granted reservation. Stored with the booking so its slots can
/// later be released by their owner only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReservationToken(Uuid);

impl ReservationToken {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

/// Occupied slots of one key, sorted by start. Slots never overlap, so the
/// end times are sorted as well.
#[derive(Debug, Default)]
pub struct Occupancy {
    entries: Vec<(Slot, ReservationToken)>,
}

impl Occupancy {
    /// Occupied slots that intersect any of `requested`.
    pub fn conflicts(&self, requested: &SlotSet) -> Vec<Slot> {
        let mut conflicting = Vec::new();
        for slot in requested {
            let first = self
                .entries
                .partition_point(|(held, _)| held.end() <= slot.start());
            conflicting.extend(
                self.entries[first..]
                    .iter()
                    .take_while(|(held, _)| held.start() < slot.end())
                    .map(|(held, _)| *held),
            );
        }
        conflicting.sort();
        conflicting.dedup();
        conflicting
    }

    /// All-or-nothing: either every slot is taken under a fresh token or
    /// nothing changes and the blocking slots are returned.
    pub fn try_reserve(&mut self, requested: &SlotSet) -> Result<ReservationToken, Vec<Slot>> {
        let token = ReservationToken::new();
        self.reserve_as(requested, token).map(|_| token)
    }

    fn reserve_as(&mut self, requested: &SlotSet, token: ReservationToken) -> Result<(), Vec<Slot>> {
        let conflicting = self.conflicts(requested);
        if !conflicting.is_empty() {
            return Err(conflicting);
        }

        for slot in requested {
            let at = self.entries.partition_point(|(held, _)| held < slot);
            self.entries.insert(at, (*slot, token));
        }
        Ok(())
    }

    /// Frees the given slots held by `token`. Slots that are absent, or now
    /// held by someone else, are left alone. Returns the number removed.
    pub fn release(&mut self, slots: &SlotSet, token: ReservationToken) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|(held, owner)| !(*owner == token && slots.as_slice().binary_search(held).is_ok()));
        before - self.entries.len()
    }

    pub fn slots(&self) -> Vec<Slot> {
        self.entries.iter().map(|(slot, _)| *slot).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Exclusive access to one key's occupancy for as long as the guard lives.
pub struct KeyGuard {
    key: SlotKey,
    occupancy: OwnedMutexGuard<Occupancy>,
}

impl KeyGuard {
    pub fn key(&self) -> SlotKey {
        self.key
    }

    pub fn try_reserve(&mut self, slots: &SlotSet) -> BookingResult<ReservationToken> {
        self.occupancy.try_reserve(slots).map_err(|conflicting| {
            warn!(
                field_id = self.key.field_id,
                booking_date = %self.key.booking_date,
                conflicts = conflicting.len(),
                "Reservation rejected: slots already booked"
            );
            BookingError::SlotConflict { conflicting }
        })
    }

    pub fn release(&mut self, slots: &SlotSet, token: ReservationToken) -> usize {
        let released = self.occupancy.release(slots, token);
        if released == 0 {
            debug!(
                field_id = self.key.field_id,
                booking_date = %self.key.booking_date,
                "Release was a no-op; slots already free"
            );
        }
        released
    }

    pub fn occupied(&self) -> Vec<Slot> {
        self.occupancy.slots()
    }
}

pub struct ConflictIndex {
    keys: DashMap<SlotKey, Arc<Mutex<Occupancy>>>,
    lock_timeout: Duration,
}

impl ConflictIndex {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            keys: DashMap::new(),
            lock_timeout,
        }
    }

    /// Waits up to the lock timeout for exclusive access to `key`.
    pub async fn lock(&self, key: SlotKey) -> BookingResult<KeyGuard> {
        // Clone the cell out so the map shard is not held across the await.
        let cell = self.keys.entry(key).or_default().value().clone();

        match tokio::time::timeout(self.lock_timeout, cell.lock_owned()).await {
            Ok(occupancy) => Ok(KeyGuard { key, occupancy }),
            Err(_) => {
                warn!(
                    field_id = key.field_id,
                    booking_date = %key.booking_date,
                    timeout_ms = self.lock_timeout.as_millis() as u64,
                    "Timed out waiting for booking lock"
                );
                Err(BookingError::StorageTimeout {
                    field_id: key.field_id,
                })
            }
        }
    }

    /// Checks and commits `slots` for `key` as one step.
    pub async fn try_reserve(&self, key: SlotKey, slots: &SlotSet) -> BookingResult<ReservationToken> {
        self.lock(key).await?.try_reserve(slots)
    }

    pub async fn release(&self, key: SlotKey, slots: &SlotSet, token: ReservationToken) -> BookingResult<usize> {
        Ok(self.lock(key).await?.release(slots, token))
    }

    /// Currently occupied slots for `key`, sorted by start.
    pub async fn occupied(&self, key: SlotKey) -> BookingResult<Vec<Slot>> {
        let Some(cell) = self.keys.get(&key).map(|entry| entry.value().clone()) else {
            return Ok(Vec::new());
        };

        match tokio::time::timeout(self.lock_timeout, cell.lock()).await {
            Ok(occupancy) => Ok(occupancy.slots()),
            Err(_) => Err(BookingError::StorageTimeout {
                field_id: key.field_id,
            }),
        }
    }

    /// Loads the slots of confirmed bookings, e.g. after a restart against a
    /// durable store. Bookings whose slots collide with an already loaded one
    /// are skipped and logged. Returns the number of bookings loaded.
    pub async fn hydrate<'a, I>(&self, bookings: I) -> BookingResult<usize>
    where
        I: IntoIterator<Item = &'a Booking>,
    {
        let mut loaded = 0;
        for booking in bookings.into_iter().filter(|b| b.is_confirmed()) {
            let cell = self.keys.entry(booking.slot_key()).or_default().value().clone();
            let mut occupancy = cell.lock().await;
            match occupancy.reserve_as(&booking.time_slots, booking.reservation_token) {
                Ok(()) => loaded += 1,
                Err(conflicting) => warn!(
                    booking_id = booking.id,
                    conflicts = conflicting.len(),
                    "Skipping booking that overlaps an already loaded reservation"
                ),
            }
        }
        Ok(loaded)
    }

    /// Number of field/date keys seen so far.
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }
}
