use crate::models::DbBooking;
use chrono::{DateTime, NaiveDate, Utc};
use eyre::Result;
use fieldbook_core::models::booking::NewBooking;
use sqlx::{Pool, Postgres};

const BOOKING_COLUMNS: &str = "id, field_id, field_name, booking_date, time_slots, total_price, \
     customer_name, customer_phone, customer_email, status, reservation_token, created_at, cancelled_at";

pub async fn insert_booking(pool: &Pool<Postgres>, booking: &NewBooking) -> Result<DbBooking> {
    let time_slots: Vec<String> = booking.time_slots.iter().map(ToString::to_string).collect();

    tracing::debug!(
        "Inserting booking: field_id={}, booking_date={}, slots={:?}",
        booking.field_id, booking.booking_date, time_slots
    );

    let row = sqlx::query_as::<_, DbBooking>(&format!(
        r#"
        INSERT INTO bookings (
            field_id, field_name, booking_date, time_slots, total_price,
            customer_name, customer_phone, customer_email, status, reservation_token, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'confirmed', $9, $10)
        RETURNING {BOOKING_COLUMNS}
        "#
    ))
    .bind(booking.field_id)
    .bind(&booking.field_name)
    .bind(booking.booking_date)
    .bind(&time_slots)
    .bind(booking.total_price)
    .bind(&booking.customer.name)
    .bind(&booking.customer.phone)
    .bind(&booking.customer.email)
    .bind(booking.reservation_token.as_uuid())
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    Ok(row)
}

pub async fn get_booking_by_id(pool: &Pool<Postgres>, id: i64) -> Result<Option<DbBooking>> {
    let row = sqlx::query_as::<_, DbBooking>(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Absent filters match every row. Rows come back in creation order.
pub async fn list_bookings(
    pool: &Pool<Postgres>,
    field_id: Option<i64>,
    booking_date: Option<NaiveDate>,
    status: Option<&str>,
) -> Result<Vec<DbBooking>> {
    let rows = sqlx::query_as::<_, DbBooking>(&format!(
        r#"
        SELECT {BOOKING_COLUMNS}
        FROM bookings
        WHERE ($1::BIGINT IS NULL OR field_id = $1)
          AND ($2::DATE IS NULL OR booking_date = $2)
          AND ($3::VARCHAR IS NULL OR status = $3)
        ORDER BY id ASC
        "#
    ))
    .bind(field_id)
    .bind(booking_date)
    .bind(status)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Moves a confirmed booking to cancelled. Returns `None` when the booking
/// does not exist or is already cancelled.
pub async fn cancel_booking(
    pool: &Pool<Postgres>,
    id: i64,
    cancelled_at: DateTime<Utc>,
) -> Result<Option<DbBooking>> {
    let row = sqlx::query_as::<_, DbBooking>(&format!(
        r#"
        UPDATE bookings
        SET status = 'cancelled', cancelled_at = $2
        WHERE id = $1 AND status = 'confirmed'
        RETURNING {BOOKING_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(cancelled_at)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
