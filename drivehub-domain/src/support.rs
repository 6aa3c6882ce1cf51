//! In-memory stores for domain unit tests, with write-failure injection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::booking::{Booking, BookingStatus, NewBooking};
use crate::car::Car;
use crate::error::StoreError;
use crate::repository::{BookingStore, CarStore, UserStore};
use crate::user::{User, UserRole};

#[derive(Default)]
pub(crate) struct MemStore {
    users: Mutex<HashMap<Uuid, User>>,
    cars: Mutex<HashMap<Uuid, Car>>,
    bookings: Mutex<Vec<Booking>>,
    fail_writes: AtomicBool,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, role: UserRole) -> Uuid {
        let id = Uuid::new_v4();
        self.users.lock().unwrap().insert(
            id,
            User {
                id,
                name: "Test User".to_string(),
                email: "test@example.com".to_string(),
                role,
                created_at: Utc::now(),
            },
        );
        id
    }

    pub fn add_car(&self, owner_id: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        self.cars.lock().unwrap().insert(
            id,
            Car {
                id,
                owner_id,
                make: "Toyota".to_string(),
                model: "Corolla".to_string(),
                manufacturing_year: 2020,
                price: 55,
                location: "Halifax".to_string(),
                description: "Test car".to_string(),
                available: true,
                created_at: Utc::now(),
            },
        );
        id
    }

    pub fn car_available(&self, id: Uuid) -> bool {
        self.cars.lock().unwrap().get(&id).unwrap().available
    }

    pub fn booking(&self, id: Uuid) -> Booking {
        self.bookings
            .lock()
            .unwrap()
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .unwrap()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writes(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StoreError::Backend("injected write failure".to_string()))
        } else {
            Ok(())
        }
    }

    fn set_car_available(&self, id: Uuid, available: bool) {
        if let Some(car) = self.cars.lock().unwrap().get_mut(&id) {
            car.available = available;
        }
    }
}

#[async_trait]
impl UserStore for MemStore {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }
}

#[async_trait]
impl CarStore for MemStore {
    async fn get_car(&self, id: Uuid) -> Result<Option<Car>, StoreError> {
        Ok(self.cars.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<Car>, StoreError> {
        let mut cars: Vec<Car> = self
            .cars
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.owner_id == owner_id)
            .cloned()
            .collect();
        cars.sort_by_key(|c| c.created_at);
        Ok(cars)
    }
}

fn matches_filter(booking: &Booking, accepted_only: bool) -> bool {
    !accepted_only || booking.status == BookingStatus::Accepted
}

#[async_trait]
impl BookingStore for MemStore {
    async fn get(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        Ok(self
            .bookings
            .lock()
            .unwrap()
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
            .bookings
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|b| b.user_id == user_id && b.car_id == car_id)
            .cloned())
    }

    async fn create_pending(&self, new: &NewBooking) -> Result<(), StoreError> {
        self.check_writes()?;
        let mut bookings = self.bookings.lock().unwrap();
        let active_exists = bookings.iter().any(|b| {
            b.user_id == new.user_id
                && b.car_id == new.car_id
                && b.status != BookingStatus::Rejected
        });
        if active_exists {
            return Err(StoreError::Conflict);
        }
        let now = Utc::now();
        bookings.push(Booking {
            id: new.id,
            user_id: new.user_id,
            car_id: new.car_id,
            start_date: new.start_date,
            end_date: new.end_date,
            status: BookingStatus::Pending,
            created_at: now,
            updated_at: now,
        });
        drop(bookings);
        self.set_car_available(new.car_id, false);
        Ok(())
    }

    async fn mark_rejected(&self, id: Uuid) -> Result<(), StoreError> {
        self.check_writes()?;
        let car_id = {
            let mut bookings = self.bookings.lock().unwrap();
            let booking = bookings
                .iter_mut()
                .find(|b| b.id == id)
                .ok_or_else(|| StoreError::Backend("booking vanished".to_string()))?;
            booking.status = BookingStatus::Rejected;
            booking.updated_at = Utc::now();
            booking.car_id
        };
        self.set_car_available(car_id, true);
        Ok(())
    }

    async fn transition_pending(&self, id: Uuid, to: BookingStatus) -> Result<bool, StoreError> {
        self.check_writes()?;
        let car_id = {
            let mut bookings = self.bookings.lock().unwrap();
            match bookings
                .iter_mut()
                .find(|b| b.id == id && b.status == BookingStatus::Pending)
            {
                Some(booking) => {
                    booking.status = to;
                    booking.updated_at = Utc::now();
                    booking.car_id
                }
                None => return Ok(false),
            }
        };
        if to == BookingStatus::Rejected {
            self.set_car_available(car_id, true);
        }
        Ok(true)
    }

    async fn find_for_user(
        &self,
        user_id: Uuid,
        accepted_only: bool,
    ) -> Result<Vec<Booking>, StoreError> {
        Ok(self
            .bookings
            .lock()
            .unwrap()
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
            .bookings
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.car_id == car_id && matches_filter(b, accepted_only))
            .cloned()
            .collect())
    }
}

pub(crate) fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}
