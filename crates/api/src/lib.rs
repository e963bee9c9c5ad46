//! # Fieldbook API
//!
//! HTTP surface of the field booking service. Requests are decoded here and
//! handed to the [`ReservationCoordinator`], which owns slot allocation and
//! conflict resolution.
//!
//! ## Architecture
//!
//! - **Routes**: endpoint paths and methods
//! - **Handlers**: extraction and response shaping
//! - **Middleware**: error to status mapping
//! - **Config**: environment driven settings

/// Configuration module for API settings
pub mod config;
/// Request handlers
pub mod handlers;
/// Error handling shared by all handlers
pub mod middleware;
/// Route definitions and API endpoint structure
pub mod routes;

use std::{sync::Arc, time::Duration};

use axum::{http::HeaderValue, Router};
use eyre::{Result, WrapErr};
use fieldbook_core::coordinator::ReservationCoordinator;
use fieldbook_db::{DbPool, PgBookingStore, PgFieldDirectory};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::FmtSubscriber;

/// Shared application state that is accessible to all request handlers
pub struct ApiState {
    pub coordinator: Arc<ReservationCoordinator>,
}

impl ApiState {
    pub fn new(coordinator: Arc<ReservationCoordinator>) -> Self {
        Self { coordinator }
    }
}

/// Builds the router with every route and layer attached. Used by
/// [`start_server`] and by tests that drive the API in memory.
pub fn build_router(state: Arc<ApiState>, config: &config::ApiConfig) -> Result<Router> {
    let app = Router::new()
        .merge(routes::health::routes())
        .merge(routes::booking::routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    // Apply CORS configuration if origins are specified
    let app = if let Some(origins) = &config.cors_origins {
        let origins = origins
            .iter()
            .map(|origin| {
                origin
                    .parse::<HeaderValue>()
                    .wrap_err_with(|| format!("Invalid CORS origin '{}'", origin))
            })
            .collect::<Result<Vec<_>>>()?;

        let cors = CorsLayer::new()
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::DELETE,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([
                axum::http::header::CONTENT_TYPE,
                axum::http::header::ACCEPT,
            ])
            .allow_origin(origins);

        app.layer(cors)
    } else {
        app
    };

    Ok(app.layer(tower_http::timeout::TimeoutLayer::new(Duration::from_secs(
        config.request_timeout,
    ))))
}

/// Starts the API server: installs logging, rebuilds the conflict index from
/// persisted bookings, then serves until the listener fails.
pub async fn start_server(config: config::ApiConfig, db_pool: DbPool) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let coordinator = Arc::new(ReservationCoordinator::new(
        Arc::new(PgFieldDirectory::new(db_pool.clone())),
        Arc::new(PgBookingStore::new(db_pool)),
        config.reservation_config(),
    ));

    let hydrated = coordinator
        .hydrate()
        .await
        .wrap_err("Failed to rebuild the conflict index")?;
    info!("Loaded {} confirmed bookings into the conflict index", hydrated);

    let app = build_router(Arc::new(ApiState::new(coordinator)), &config)?;

    let addr = config.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
