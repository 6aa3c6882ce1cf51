use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::info;
use uuid::Uuid;

use crate::booking::{BookingStatus, NewBooking};
use crate::error::DomainError;
use crate::repository::{BookingStore, CarStore, UserStore};
use crate::validate::{self, CreateBookingPayload};

/// Async mutexes keyed by `(user_id, car_id)`. Two concurrent create
/// calls for the same pair could otherwise both pass the duplicate check
/// before either writes.
struct PairLocks {
    locks: Mutex<HashMap<(Uuid, Uuid), Arc<tokio::sync::Mutex<()>>>>,
}

impl PairLocks {
    fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, user_id: Uuid, car_id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().expect("pair lock table poisoned");
        locks
            .entry((user_id, car_id))
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

/// Owns every booking state transition and is the only booking-side
/// writer of a car's availability flag.
pub struct BookingEngine {
    users: Arc<dyn UserStore>,
    cars: Arc<dyn CarStore>,
    bookings: Arc<dyn BookingStore>,
    pair_locks: PairLocks,
}

impl BookingEngine {
    pub fn new(
        users: Arc<dyn UserStore>,
        cars: Arc<dyn CarStore>,
        bookings: Arc<dyn BookingStore>,
    ) -> Self {
        Self {
            users,
            cars,
            bookings,
            pair_locks: PairLocks::new(),
        }
    }

    /// Create a booking request. On success the booking is Pending and
    /// the car is no longer available.
    pub async fn create(&self, payload: &CreateBookingPayload) -> Result<Uuid, DomainError> {
        let valid = validate::validate(payload).map_err(DomainError::Validation)?;

        let pair_lock = self.pair_locks.lock_for(valid.user_id, valid.car_id);
        let _guard = pair_lock.lock().await;

        // Re-request after rejection is only legal once the new start
        // date is strictly past the rejected booking's end date.
        if let Some(existing) = self
            .bookings
            .latest_for_pair(valid.user_id, valid.car_id)
            .await?
        {
            match existing.status {
                BookingStatus::Rejected => {
                    if existing.end_date >= valid.start_date {
                        return Err(DomainError::Conflict(
                            "This request already exists".to_string(),
                        ));
                    }
                }
                BookingStatus::Pending | BookingStatus::Accepted => {
                    return Err(DomainError::Conflict(
                        "An active request already exists for this car".to_string(),
                    ));
                }
            }
        }

        self.users
            .get_user(valid.user_id)
            .await?
            .ok_or(DomainError::NotFound("user"))?;
        self.cars
            .get_car(valid.car_id)
            .await?
            .ok_or(DomainError::NotFound("car"))?;

        // Booking insert and availability flip are one atomic store
        // operation; a uniqueness conflict from the store maps onto the
        // same taxonomy via From<StoreError>.
        let new = NewBooking::new(valid.user_id, valid.car_id, valid.start_date, valid.end_date);
        self.bookings.create_pending(&new).await?;

        info!(booking_id = %new.id, car_id = %new.car_id, "booking created");
        Ok(new.id)
    }

    /// Unconditional reject. Idempotent: rejecting an already-rejected
    /// booking succeeds and leaves the same state.
    pub async fn reject(&self, booking_id: &str) -> Result<(), DomainError> {
        let id = validate::parse_id("booking_id", booking_id).map_err(DomainError::Validation)?;

        self.bookings
            .get(id)
            .await?
            .ok_or(DomainError::NotFound("booking"))?;

        self.bookings.mark_rejected(id).await?;
        info!(booking_id = %id, "booking rejected");
        Ok(())
    }

    /// Owner's accept/reject decision on a Pending booking. Exactly one
    /// respond call may succeed per booking.
    pub async fn respond(
        &self,
        booking_id: &str,
        accept: bool,
    ) -> Result<BookingStatus, DomainError> {
        let id = validate::parse_id("booking_id", booking_id).map_err(DomainError::Validation)?;

        let booking = self
            .bookings
            .get(id)
            .await?
            .ok_or(DomainError::NotFound("booking"))?;
        if booking.status != BookingStatus::Pending {
            return Err(DomainError::Conflict(
                "Booking is already accepted or rejected".to_string(),
            ));
        }

        let to = if accept {
            BookingStatus::Accepted
        } else {
            BookingStatus::Rejected
        };

        // Conditional update: the status check above can lose a race
        // against a concurrent respond, so the store transitions only
        // rows still Pending.
        if !self.bookings.transition_pending(id, to).await? {
            return Err(DomainError::Conflict(
                "Booking is already accepted or rejected".to_string(),
            ));
        }

        info!(booking_id = %id, status = to.as_str(), "booking resolved");
        Ok(to)
    }
}
