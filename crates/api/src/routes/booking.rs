use axum::{
    routing::get,
    Router,
};
use std::sync::Arc;

use crate::{handlers, ApiState};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route(
            "/api/booking",
            get(handlers::booking::list_bookings).post(handlers::booking::create_booking),
        )
        .route(
            "/api/booking/check-availability",
            get(handlers::booking::check_availability),
        )
        .route(
            "/api/booking/:id",
            get(handlers::booking::get_booking).delete(handlers::booking::cancel_booking),
        )
}
