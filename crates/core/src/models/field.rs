use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sport {
    pub id: i64,
    pub sport_name: String,
    pub sport_type: String,
    pub is_available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub id: i64,
    pub field_name: String,
    pub field_code: String,
    pub sport_id: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub price_per_hour: Decimal,
    pub is_available: bool,
}
