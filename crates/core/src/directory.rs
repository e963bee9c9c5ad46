use async_trait::async_trait;
use dashmap::DashMap;

use crate::{
    errors::BookingResult,
    models::field::{Field, Sport},
};

/// Read-only source of field pricing and availability.
#[async_trait]
pub trait FieldDirectory: Send + Sync {
    async fn get_field(&self, id: i64) -> BookingResult<Option<Field>>;

    async fn get_sport(&self, id: i64) -> BookingResult<Option<Sport>>;
}

/// In-process directory, used by tests and embedded setups.
#[derive(Debug, Default)]
pub struct StaticFieldDirectory {
    fields: DashMap<i64, Field>,
    sports: DashMap<i64, Sport>,
}

impl StaticFieldDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sport(self, sport: Sport) -> Self {
        self.sports.insert(sport.id, sport);
        self
    }

    pub fn with_field(self, field: Field) -> Self {
        self.fields.insert(field.id, field);
        self
    }

    /// Replaces a field, e.g. to toggle availability.
    pub fn upsert_field(&self, field: Field) {
        self.fields.insert(field.id, field);
    }
}

#[async_trait]
impl FieldDirectory for StaticFieldDirectory {
    async fn get_field(&self, id: i64) -> BookingResult<Option<Field>> {
        Ok(self.fields.get(&id).map(|entry| entry.value().clone()))
    }

    async fn get_sport(&self, id: i64) -> BookingResult<Option<Sport>> {
        Ok(self.sports.get(&id).map(|entry| entry.value().clone()))
    }
}
