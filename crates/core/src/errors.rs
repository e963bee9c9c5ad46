use thiserror::Error;

use crate::slot::Slot;

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Malformed time slot: {0}")]
    MalformedSlot(String),

    #[error("Time slots {first} and {second} overlap within the same request")]
    OverlappingSlotsInRequest { first: Slot, second: Slot },

    #[error("Field with ID {0} not found")]
    FieldNotFound(i64),

    #[error("Field with ID {0} is not available for booking")]
    FieldUnavailable(i64),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Booking with ID {0} is already cancelled")]
    AlreadyCancelled(i64),

    #[error("Selected time slots are already booked: {}", join_slots(.conflicting))]
    SlotConflict { conflicting: Vec<Slot> },

    #[error("Timed out waiting for the booking lock on field {field_id}, please retry")]
    StorageTimeout { field_id: i64 },

    #[error("Storage error: {0}")]
    Storage(#[from] eyre::Report),
}

impl BookingError {
    /// Request-shape failures the caller can fix by changing the payload.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            BookingError::Validation(_)
                | BookingError::MalformedSlot(_)
                | BookingError::OverlappingSlotsInRequest { .. }
        )
    }

    /// Infrastructure failures that may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BookingError::StorageTimeout { .. })
    }
}

fn join_slots(slots: &[Slot]) -> String {
    slots
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub type BookingResult<T> = Result<T, BookingError>;
