use async_trait::async_trait;
use uuid::Uuid;

use crate::booking::{Booking, BookingStatus, NewBooking};
use crate::car::Car;
use crate::error::StoreError;
use crate::user::User;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;
}

#[async_trait]
pub trait CarStore: Send + Sync {
    async fn get_car(&self, id: Uuid) -> Result<Option<Car>, StoreError>;

    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<Car>, StoreError>;
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<Booking>, StoreError>;

    /// Most recent booking for the pair, resolved or not.
    async fn latest_for_pair(
        &self,
        user_id: Uuid,
        car_id: Uuid,
    ) -> Result<Option<Booking>, StoreError>;

    /// Insert a Pending booking and mark the car unavailable as one
    /// atomic unit. Raises `StoreError::Conflict` if an active booking
    /// already exists for the pair.
    async fn create_pending(&self, booking: &NewBooking) -> Result<(), StoreError>;

    /// Set status to Rejected regardless of current status and mark the
    /// car available, atomically. Idempotent.
    async fn mark_rejected(&self, id: Uuid) -> Result<(), StoreError>;

    /// Conditional transition out of Pending. Returns false when the
    /// booking was no longer Pending (lost race or already resolved).
    /// A transition to Rejected marks the car available in the same unit.
    async fn transition_pending(&self, id: Uuid, to: BookingStatus) -> Result<bool, StoreError>;

    async fn find_for_user(
        &self,
        user_id: Uuid,
        accepted_only: bool,
    ) -> Result<Vec<Booking>, StoreError>;

    async fn find_for_car(
        &self,
        car_id: Uuid,
        accepted_only: bool,
    ) -> Result<Vec<Booking>, StoreError>;
}
