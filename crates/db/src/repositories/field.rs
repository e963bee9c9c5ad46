use crate::models::{DbField, DbSport};
use eyre::Result;
use sqlx::{Pool, Postgres};

pub async fn get_field_by_id(pool: &Pool<Postgres>, id: i64) -> Result<Option<DbField>> {
    let field = sqlx::query_as::<_, DbField>(
        r#"
        SELECT id, field_name, field_code, sport_id, price_per_hour, is_available
        FROM fields
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(field)
}

pub async fn get_sport_by_id(pool: &Pool<Postgres>, id: i64) -> Result<Option<DbSport>> {
    let sport = sqlx::query_as::<_, DbSport>(
        r#"
        SELECT id, sport_name, sport_type, is_available
        FROM sports
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(sport)
}
