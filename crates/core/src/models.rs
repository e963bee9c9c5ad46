pub mod booking;
pub mod field;
