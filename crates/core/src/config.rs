use std::{str::FromStr, time::Duration};

use crate::{
    errors::BookingError,
    slot::OperatingHours,
};

/// How a client-supplied `total_price` is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PricePolicy {
    /// The server price always wins; the client value is ignored.
    #[default]
    Recompute,
    /// A client value that disagrees with the server price is rejected.
    Strict,
}

impl FromStr for PricePolicy {
    type Err = BookingError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "recompute" => Ok(PricePolicy::Recompute),
            "strict" => Ok(PricePolicy::Strict),
            other => Err(BookingError::Validation(format!(
                "Unknown price policy '{}', expected 'recompute' or 'strict'",
                other
            ))),
        }
    }
}

/// Tunables for the reservation engine.
#[derive(Debug, Clone)]
pub struct ReservationConfig {
    /// Upper bound on waiting for a field/date lock before failing with a
    /// retryable timeout.
    pub lock_timeout: Duration,
    pub price_policy: PricePolicy,
    /// When set, every slot must fall inside this window.
    pub operating_hours: Option<OperatingHours>,
}

impl Default for ReservationConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_millis(2000),
            price_policy: PricePolicy::default(),
            operating_hours: None,
        }
    }
}
