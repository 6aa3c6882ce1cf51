//! HashMap-backed implementation of the store traits. Carries the same
//! conflict and compare-and-set semantics as the Postgres store; used by
//! API integration tests and for running without a database.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use drivehub_domain::repository::{BookingStore, CarStore, UserStore};
use drivehub_domain::{Booking, BookingStatus, Car, NewBooking, StoreError, User};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    cars: HashMap<Uuid, Car>,
    // Insertion order doubles as creation order.
    bookings: Vec<Booking>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, user: User) {
        self.inner.lock().unwrap().users.insert(user.id, user);
    }

    pub fn add_car(&self, car: Car) {
        self.inner.lock().unwrap().cars.insert(car.id, car);
    }

    pub fn car_available(&self, id: Uuid) -> Option<bool> {
        self.inner.lock().unwrap().cars.get(&id).map(|c| c.available)
    }

    pub fn booking(&self, id: Uuid) -> Option<Booking> {
        self.inner
            .lock()
            .unwrap()
            .bookings
            .iter()
            .find(|b| b.id == id)
            .cloned()
    }
}

fn matches_filter(booking: &Booking, accepted_only: bool) -> bool {
    !accepted_only || booking.status == BookingStatus::Accepted
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.inner.lock().unwrap().users.get(&id).cloned())
    }
}

#[async_trait]
impl CarStore for MemoryStore {
    async fn get_car(&self, id: Uuid) -> Result<Option<Car>, StoreError> {
        Ok(self.inner.lock().unwrap().cars.get(&id).cloned())
    }

    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<Car>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut cars: Vec<Car> = inner
            .cars
            .values()
            .filter(|c| c.owner_id == owner_id)
            .cloned()
            .collect();
        cars.sort_by_key(|c| c.created_at);
        Ok(cars)
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn get(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .bookings
            .iter()
            .find(|b| b.id == id)
            .cloned())
    }

    async fn latest_for_pair(
        &self,
        user_id: Uuid,
        car_id: Uuid,
    ) -> Result<Option<Booking>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .bookings
            .iter()
            .rev()
            .find(|b| b.user_id == user_id && b.car_id == car_id)
            .cloned())
    }

    async fn create_pending(&self, new: &NewBooking) -> Result<(), StoreError> {
        // One critical section stands in for the Postgres transaction.
        let mut inner = self.inner.lock().unwrap();
        let active_exists = inner.bookings.iter().any(|b| {
            b.user_id == new.user_id
                && b.car_id == new.car_id
                && b.status != BookingStatus::Rejected
        });
        if active_exists {
            return Err(StoreError::Conflict);
        }

        let now = Utc::now();
        inner.bookings.push(Booking {
            id: new.id,
            user_id: new.user_id,
            car_id: new.car_id,
            start_date: new.start_date,
            end_date: new.end_date,
            status: BookingStatus::Pending,
            created_at: now,
            updated_at: now,
        });
        if let Some(car) = inner.cars.get_mut(&new.car_id) {
            car.available = false;
        }
        Ok(())
    }

    async fn mark_rejected(&self, id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let car_id = {
            let booking = inner
                .bookings
                .iter_mut()
                .find(|b| b.id == id)
                .ok_or_else(|| StoreError::Backend(format!("booking {id} missing on reject")))?;
            booking.status = BookingStatus::Rejected;
            booking.updated_at = Utc::now();
            booking.car_id
        };
        if let Some(car) = inner.cars.get_mut(&car_id) {
            car.available = true;
        }
        Ok(())
    }

    async fn transition_pending(&self, id: Uuid, to: BookingStatus) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let car_id = match inner
            .bookings
            .iter_mut()
            .find(|b| b.id == id && b.status == BookingStatus::Pending)
        {
            Some(booking) => {
                booking.status = to;
                booking.updated_at = Utc::now();
                booking.car_id
            }
            None => return Ok(false),
        };
        if to == BookingStatus::Rejected {
            if let Some(car) = inner.cars.get_mut(&car_id) {
                car.available = true;
            }
        }
        Ok(true)
    }

    async fn find_for_user(
        &self,
        user_id: Uuid,
        accepted_only: bool,
    ) -> Result<Vec<Booking>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .bookings
            .iter()
            .filter(|b| b.user_id == user_id && matches_filter(b, accepted_only))
            .cloned()
            .collect())
    }

    async fn find_for_car(
        &self,
        car_id: Uuid,
        accepted_only: bool,
    ) -> Result<Vec<Booking>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .bookings
            .iter()
            .filter(|b| b.car_id == car_id && matches_filter(b, accepted_only))
            .cloned()
            .collect())
    }
}
