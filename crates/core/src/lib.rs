//! # Fieldbook Core
//!
//! Domain types and the reservation engine for the Fieldbook sports-field
//! booking service. Storage and HTTP live in sibling crates; this crate only
//! depends on them through the [`FieldDirectory`](directory::FieldDirectory)
//! and [`BookingStore`](ledger::BookingStore) traits.

pub mod config;
pub mod conflict_index;
pub mod coordinator;
pub mod directory;
pub mod errors;
pub mod ledger;
pub mod models;
pub mod slot;

pub use config::{PricePolicy, ReservationConfig};
pub use conflict_index::{ConflictIndex, ReservationToken, SlotKey};
pub use coordinator::ReservationCoordinator;
pub use directory::{FieldDirectory, StaticFieldDirectory};
pub use errors::{BookingError, BookingResult};
pub use ledger::{BookingStore, InMemoryBookingStore, Ledger};
pub use slot::{OperatingHours, Slot, SlotSet};
