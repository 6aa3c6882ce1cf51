use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use drivehub_domain::repository::CarStore;
use drivehub_domain::{Car, StoreError};

use crate::map_sqlx_err;

pub struct PgCarStore {
    pool: PgPool,
}

impl PgCarStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const CAR_COLUMNS: &str =
    "id, owner_id, make, model, manufacturing_year, price, location, description, is_available, created_at";

#[derive(sqlx::FromRow)]
struct CarRow {
    id: Uuid,
    owner_id: Uuid,
    make: String,
    model: String,
    manufacturing_year: i32,
    price: i64,
    location: String,
    description: String,
    is_available: bool,
    created_at: DateTime<Utc>,
}

impl From<CarRow> for Car {
    fn from(row: CarRow) -> Self {
        Car {
            id: row.id,
            owner_id: row.owner_id,
            make: row.make,
            model: row.model,
            manufacturing_year: row.manufacturing_year,
            price: row.price,
            location: row.location,
            description: row.description,
            available: row.is_available,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl CarStore for PgCarStore {
    async fn get_car(&self, id: Uuid) -> Result<Option<Car>, StoreError> {
        let row = sqlx::query_as::<_, CarRow>(&format!(
            "SELECT {CAR_COLUMNS} FROM cars WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(row.map(Car::from))
    }

    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<Car>, StoreError> {
        let rows = sqlx::query_as::<_, CarRow>(&format!(
            "SELECT {CAR_COLUMNS} FROM cars WHERE owner_id = $1 ORDER BY created_at"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(rows.into_iter().map(Car::from).collect())
    }
}
