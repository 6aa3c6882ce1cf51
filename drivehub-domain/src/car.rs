use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Car {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub make: String,
    pub model: String,
    pub manufacturing_year: i32,
    pub price: i64,
    pub location: String,
    pub description: String,
    /// Flipped by the booking engine only; the catalog owns every other
    /// mutation of a car.
    pub available: bool,
    pub created_at: DateTime<Utc>,
}
