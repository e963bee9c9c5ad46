/// Booking creation, lookup, cancellation and availability
pub mod booking;
