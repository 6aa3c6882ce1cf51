use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use drivehub_domain::repository::BookingStore;
use drivehub_domain::{Booking, BookingStatus, NewBooking, StoreError};

use crate::map_sqlx_err;

pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const BOOKING_COLUMNS: &str =
    "id, user_id, car_id, start_date, end_date, status, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    user_id: Uuid,
    car_id: Uuid,
    start_date: NaiveDate,
    end_date: NaiveDate,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BookingRow {
    fn into_booking(self) -> Result<Booking, StoreError> {
        let status = BookingStatus::parse(&self.status)
            .ok_or_else(|| StoreError::Backend(format!("unknown booking status: {}", self.status)))?;
        Ok(Booking {
            id: self.id,
            user_id: self.user_id,
            car_id: self.car_id,
            start_date: self.start_date,
            end_date: self.end_date,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn rows_to_bookings(rows: Vec<BookingRow>) -> Result<Vec<Booking>, StoreError> {
    rows.into_iter().map(BookingRow::into_booking).collect()
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn get(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        row.map(BookingRow::into_booking).transpose()
    }

    async fn latest_for_pair(
        &self,
        user_id: Uuid,
        car_id: Uuid,
    ) -> Result<Option<Booking>, StoreError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings \
             WHERE user_id = $1 AND car_id = $2 \
             ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(user_id)
        .bind(car_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        row.map(BookingRow::into_booking).transpose()
    }

    async fn create_pending(&self, new: &NewBooking) -> Result<(), StoreError> {
        // Booking insert and availability flip commit together. The
        // partial unique index on active pairs turns a racing duplicate
        // insert into StoreError::Conflict.
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        sqlx::query(
            "INSERT INTO bookings (id, user_id, car_id, start_date, end_date, status) \
             VALUES ($1, $2, $3, $4, $5, 'PENDING')",
        )
        .bind(new.id)
        .bind(new.user_id)
        .bind(new.car_id)
        .bind(new.start_date)
        .bind(new.end_date)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        sqlx::query("UPDATE cars SET is_available = FALSE WHERE id = $1")
            .bind(new.car_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_err)?;

        tx.commit().await.map_err(map_sqlx_err)
    }

    async fn mark_rejected(&self, id: Uuid) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        let car_id: Option<Uuid> = sqlx::query_scalar(
            "UPDATE bookings SET status = 'REJECTED', updated_at = NOW() \
             WHERE id = $1 RETURNING car_id",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        let car_id = car_id
            .ok_or_else(|| StoreError::Backend(format!("booking {id} missing on reject")))?;

        sqlx::query("UPDATE cars SET is_available = TRUE WHERE id = $1")
            .bind(car_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_err)?;

        tx.commit().await.map_err(map_sqlx_err)
    }

    async fn transition_pending(&self, id: Uuid, to: BookingStatus) -> Result<bool, StoreError> {
        // Compare-and-set on the current status so a concurrent respond
        // cannot resolve the same booking twice.
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        let car_id: Option<Uuid> = sqlx::query_scalar(
            "UPDATE bookings SET status = $2, updated_at = NOW() \
             WHERE id = $1 AND status = 'PENDING' RETURNING car_id",
        )
        .bind(id)
        .bind(to.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        let Some(car_id) = car_id else {
            return Ok(false);
        };

        if to == BookingStatus::Rejected {
            sqlx::query("UPDATE cars SET is_available = TRUE WHERE id = $1")
                .bind(car_id)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_err)?;
        }

        tx.commit().await.map_err(map_sqlx_err)?;
        Ok(true)
    }

    async fn find_for_user(
        &self,
        user_id: Uuid,
        accepted_only: bool,
    ) -> Result<Vec<Booking>, StoreError> {
        let sql = if accepted_only {
            format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings \
                 WHERE user_id = $1 AND status = 'ACCEPTED' ORDER BY created_at"
            )
        } else {
            format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE user_id = $1 ORDER BY created_at")
        };

        let rows = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        rows_to_bookings(rows)
    }

    async fn find_for_car(
        &self,
        car_id: Uuid,
        accepted_only: bool,
    ) -> Result<Vec<Booking>, StoreError> {
        let sql = if accepted_only {
            format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings \
                 WHERE car_id = $1 AND status = 'ACCEPTED' ORDER BY created_at"
            )
        } else {
            format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE car_id = $1 ORDER BY created_at")
        };

        let rows = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(car_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        rows_to_bookings(rows)
    }
}
