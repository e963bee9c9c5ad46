/// Booking endpoints under `/api/booking`
pub mod booking;
/// Liveness and build information
pub mod health;
