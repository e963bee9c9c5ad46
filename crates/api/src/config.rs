//! # API Configuration Module
//!
//! Loads server and reservation settings from environment variables, with
//! defaults where the value is optional.
//!
//! ## Environment Variables
//!
//! - `API_HOST`: The host address to bind the server to (default: "0.0.0.0")
//! - `API_PORT`: The port to listen on (default: 3000)
//! - `DATABASE_URL`: PostgreSQL connection string (required)
//! - `LOG_LEVEL`: Logging level (default: "info")
//! - `API_CORS_ORIGINS`: Comma-separated list of allowed CORS origins
//! - `API_REQUEST_TIMEOUT_SECONDS`: Per-request timeout (default: 30)
//! - `BOOKING_LOCK_TIMEOUT_MS`: Wait bound for a field/date lock (default: 2000)
//! - `BOOKING_PRICE_POLICY`: `recompute` or `strict` (default: "recompute")
//! - `BOOKING_OPERATING_HOURS`: Optional bookable window, e.g. "06:00-23:00"

use std::{env, time::Duration};

use eyre::{Result, WrapErr};
use fieldbook_core::{
    config::{PricePolicy, ReservationConfig},
    slot::OperatingHours,
};
use tracing::Level;

/// Configuration for the booking API server
///
/// # Example
///
/// ```no_run
/// use eyre::Result;
/// use fieldbook_api::config::ApiConfig;
///
/// fn example() -> Result<()> {
///     let config = ApiConfig::from_env()?;
///     println!("Starting server on {}:{}", config.host, config.port);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host address for the API server (e.g., "127.0.0.1", "0.0.0.0")
    pub host: String,

    /// Port for the API server to listen on
    pub port: u16,

    /// PostgreSQL database connection string
    pub database_url: String,

    /// Log level for the application
    pub log_level: Level,

    /// CORS allowed origins (optional)
    pub cors_origins: Option<Vec<String>>,

    /// Request timeout in seconds
    pub request_timeout: u64,

    pub lock_timeout_ms: u64,

    pub price_policy: PricePolicy,

    pub operating_hours: Option<OperatingHours>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            database_url: String::new(),
            log_level: Level::INFO,
            cors_origins: None,
            request_timeout: 30,
            lock_timeout_ms: 2000,
            price_policy: PricePolicy::default(),
            operating_hours: None,
        }
    }
}

impl ApiConfig {
    /// Creates a new ApiConfig from environment variables
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - The DATABASE_URL environment variable is not set
    /// - The API_PORT value cannot be parsed as a u16
    /// - A BOOKING_* value is present but malformed
    pub fn from_env() -> Result<Self> {
        // Network settings
        let host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("API_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .wrap_err("Invalid API_PORT value")?;

        // Database settings
        let database_url = env::var("DATABASE_URL")
            .wrap_err("DATABASE_URL environment variable must be set")?;

        // Logging settings
        let log_level = parse_log_level(&env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()));

        // CORS settings
        let cors_origins = env::var("API_CORS_ORIGINS").ok().map(|origins| {
            origins.split(',').map(|s| s.trim().to_string()).collect()
        });

        // Performance settings
        let request_timeout = env::var("API_REQUEST_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);

        // Reservation settings
        let lock_timeout_ms = env::var("BOOKING_LOCK_TIMEOUT_MS")
            .unwrap_or_else(|_| "2000".to_string())
            .parse()
            .wrap_err("Invalid BOOKING_LOCK_TIMEOUT_MS value")?;

        let price_policy = match env::var("BOOKING_PRICE_POLICY") {
            Ok(raw) => raw.parse::<PricePolicy>().wrap_err("Invalid BOOKING_PRICE_POLICY value")?,
            Err(_) => PricePolicy::default(),
        };

        let operating_hours = env::var("BOOKING_OPERATING_HOURS")
            .ok()
            .map(|raw| raw.parse::<OperatingHours>())
            .transpose()
            .wrap_err("Invalid BOOKING_OPERATING_HOURS value")?;

        Ok(Self {
            host,
            port,
            database_url,
            log_level,
            cors_origins,
            request_timeout,
            lock_timeout_ms,
            price_policy,
            operating_hours,
        })
    }

    /// Returns the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn reservation_config(&self) -> ReservationConfig {
        ReservationConfig {
            lock_timeout: Duration::from_millis(self.lock_timeout_ms),
            price_policy: self.price_policy,
            operating_hours: self.operating_hours,
        }
    }
}

pub fn parse_log_level(raw: &str) -> Level {
    match raw.trim().to_ascii_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}
