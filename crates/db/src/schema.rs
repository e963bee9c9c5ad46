use eyre::Result;
use sqlx::{Pool, Postgres};
use tracing::info;

pub async fn initialize_database(pool: &Pool<Postgres>) -> Result<()> {
    info!("Initializing database schema...");

    // Create sports table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sports (
            id BIGSERIAL PRIMARY KEY,
            sport_name VARCHAR(255) NOT NULL,
            sport_type VARCHAR(255) NOT NULL,
            description TEXT NULL,
            is_available BOOLEAN NOT NULL DEFAULT TRUE,
            updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create fields table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS fields (
            id BIGSERIAL PRIMARY KEY,
            field_name VARCHAR(255) NOT NULL,
            field_code VARCHAR(64) NOT NULL,
            sport_id BIGINT NOT NULL REFERENCES sports(id),
            price_per_hour NUMERIC(12, 2) NOT NULL,
            description TEXT NULL,
            url_image TEXT NULL,
            is_available BOOLEAN NOT NULL DEFAULT TRUE,
            updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            CONSTRAINT positive_price CHECK (price_per_hour > 0)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create bookings table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bookings (
            id BIGSERIAL PRIMARY KEY,
            field_id BIGINT NOT NULL REFERENCES fields(id),
            field_name VARCHAR(255) NOT NULL,
            booking_date DATE NOT NULL,
            time_slots TEXT[] NOT NULL,
            total_price NUMERIC(12, 2) NOT NULL,
            customer_name VARCHAR(255) NOT NULL,
            customer_phone VARCHAR(64) NOT NULL,
            customer_email VARCHAR(255) NOT NULL,
            status VARCHAR(16) NOT NULL DEFAULT 'confirmed',
            reservation_token UUID NOT NULL UNIQUE,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            cancelled_at TIMESTAMP WITH TIME ZONE NULL,
            CONSTRAINT non_empty_slots CHECK (cardinality(time_slots) > 0),
            CONSTRAINT known_status CHECK (status IN ('confirmed', 'cancelled'))
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    for statement in [
        "CREATE INDEX IF NOT EXISTS idx_fields_sport_id ON fields(sport_id)",
        "CREATE INDEX IF NOT EXISTS idx_bookings_field_date ON bookings(field_id, booking_date)",
        "CREATE INDEX IF NOT EXISTS idx_bookings_status ON bookings(status)",
    ] {
        sqlx::query(statement).execute(pool).await?;
    }

    info!("Database schema initialized successfully.");
    Ok(())
}
