pub mod app_config;
pub mod booking_repo;
pub mod car_repo;
pub mod database;
pub mod memory;
pub mod user_repo;

pub use booking_repo::PgBookingStore;
pub use car_repo::PgCarStore;
pub use database::DbClient;
pub use memory::MemoryStore;
pub use user_repo::PgUserStore;

use drivehub_domain::StoreError;

/// Postgres unique_violation; raised by the partial index on active
/// `(user_id, car_id)` pairs.
const UNIQUE_VIOLATION: &str = "23505";

pub(crate) fn map_sqlx_err(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return StoreError::Conflict;
        }
    }
    StoreError::Backend(err.to_string())
}
