use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use crate::booking::{Booking, BookingDetails};
use crate::car::Car;
use crate::error::DomainError;
use crate::repository::{BookingStore, CarStore, UserStore};
use crate::user::{User, UserRole, UserSummary};
use crate::validate;

/// Read side of the booking core: per-user listings with role-dependent
/// scope and denormalized user/car views.
pub struct BookingQueries {
    users: Arc<dyn UserStore>,
    cars: Arc<dyn CarStore>,
    bookings: Arc<dyn BookingStore>,
}

impl BookingQueries {
    pub fn new(
        users: Arc<dyn UserStore>,
        cars: Arc<dyn CarStore>,
        bookings: Arc<dyn BookingStore>,
    ) -> Self {
        Self {
            users,
            cars,
            bookings,
        }
    }

    /// Rental agents see their own requests; everyone else is treated as
    /// a car owner and sees requests against their cars, car by car.
    /// `active_only` narrows to Accepted bookings. Empty is success.
    pub async fn list(
        &self,
        user_id: &str,
        active_only: bool,
    ) -> Result<Vec<BookingDetails>, DomainError> {
        let id = validate::parse_id("user_id", user_id).map_err(DomainError::Validation)?;
        let user = self
            .users
            .get_user(id)
            .await?
            .ok_or(DomainError::NotFound("user"))?;

        let bookings = match user.role {
            UserRole::RentalAgent => self.bookings.find_for_user(id, active_only).await?,
            UserRole::Owner | UserRole::Admin => {
                let mut rows = Vec::new();
                for car in self.cars.find_by_owner(id).await? {
                    rows.extend(self.bookings.find_for_car(car.id, active_only).await?);
                }
                rows
            }
        };

        self.hydrate(bookings).await
    }

    /// Attach the requester summary and the car record to each row.
    /// Lookups are cached per id so a busy car or user is fetched once.
    async fn hydrate(&self, bookings: Vec<Booking>) -> Result<Vec<BookingDetails>, DomainError> {
        let mut users: HashMap<Uuid, User> = HashMap::new();
        let mut cars: HashMap<Uuid, Car> = HashMap::new();
        let mut details = Vec::with_capacity(bookings.len());

        for booking in bookings {
            if !users.contains_key(&booking.user_id) {
                match self.users.get_user(booking.user_id).await? {
                    Some(user) => {
                        users.insert(booking.user_id, user);
                    }
                    None => {
                        warn!(booking_id = %booking.id, user_id = %booking.user_id,
                              "booking references missing user, skipping row");
                        continue;
                    }
                }
            }
            if !cars.contains_key(&booking.car_id) {
                match self.cars.get_car(booking.car_id).await? {
                    Some(car) => {
                        cars.insert(booking.car_id, car);
                    }
                    None => {
                        warn!(booking_id = %booking.id, car_id = %booking.car_id,
                              "booking references missing car, skipping row");
                        continue;
                    }
                }
            }

            details.push(BookingDetails {
                user: UserSummary::from(&users[&booking.user_id]),
                car: cars[&booking.car_id].clone(),
                booking,
            });
        }

        Ok(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::BookingEngine;
    use crate::support::MemStore;
    use crate::validate::CreateBookingPayload;

    struct Fixture {
        store: Arc<MemStore>,
        engine: BookingEngine,
        queries: BookingQueries,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemStore::new());
        Fixture {
            engine: BookingEngine::new(store.clone(), store.clone(), store.clone()),
            queries: BookingQueries::new(store.clone(), store.clone(), store.clone()),
            store,
        }
    }

    async fn book(fx: &Fixture, user: Uuid, car: Uuid, start: &str, end: &str) -> Uuid {
        fx.engine
            .create(&CreateBookingPayload {
                start_date: start.to_string(),
                end_date: end.to_string(),
                user_id: user.to_string(),
                car_id: car.to_string(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn agent_sees_own_bookings_with_details() {
        let fx = fixture();
        let owner = fx.store.add_user(UserRole::Owner);
        let agent = fx.store.add_user(UserRole::RentalAgent);
        let car_a = fx.store.add_car(owner);
        let car_b = fx.store.add_car(owner);

        book(&fx, agent, car_a, "2024-02-01", "2024-02-05").await;
        book(&fx, agent, car_b, "2024-03-01", "2024-03-05").await;

        let rows = fx.queries.list(&agent.to_string(), false).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.user.id == agent));
        assert!(rows.iter().all(|r| r.car.owner_id == owner));
    }

    #[tokio::test]
    async fn active_only_narrows_to_accepted() {
        let fx = fixture();
        let owner = fx.store.add_user(UserRole::Owner);
        let agent = fx.store.add_user(UserRole::RentalAgent);
        let car_a = fx.store.add_car(owner);
        let car_b = fx.store.add_car(owner);

        let accepted = book(&fx, agent, car_a, "2024-02-01", "2024-02-05").await;
        fx.engine.respond(&accepted.to_string(), true).await.unwrap();
        book(&fx, agent, car_b, "2024-03-01", "2024-03-05").await; // stays Pending

        let rows = fx.queries.list(&agent.to_string(), true).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].booking.id, accepted);
    }

    #[tokio::test]
    async fn owner_sees_bookings_across_owned_cars() {
        let fx = fixture();
        let owner = fx.store.add_user(UserRole::Owner);
        let other_owner = fx.store.add_user(UserRole::Owner);
        let agent_a = fx.store.add_user(UserRole::RentalAgent);
        let agent_b = fx.store.add_user(UserRole::RentalAgent);
        let car_a = fx.store.add_car(owner);
        let car_b = fx.store.add_car(owner);
        let foreign_car = fx.store.add_car(other_owner);

        let a = book(&fx, agent_a, car_a, "2024-02-01", "2024-02-05").await;
        let b = book(&fx, agent_b, car_b, "2024-02-10", "2024-02-12").await;
        book(&fx, agent_a, foreign_car, "2024-02-20", "2024-02-22").await;

        let rows = fx.queries.list(&owner.to_string(), false).await.unwrap();
        let ids: Vec<Uuid> = rows.iter().map(|r| r.booking.id).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&a) && ids.contains(&b));
        // Each row carries the requester, not the owner.
        assert!(rows.iter().all(|r| r.user.id == agent_a || r.user.id == agent_b));
    }

    #[tokio::test]
    async fn owner_active_only_returns_accepted_across_cars() {
        let fx = fixture();
        let owner = fx.store.add_user(UserRole::Owner);
        let agent = fx.store.add_user(UserRole::RentalAgent);
        let car_a = fx.store.add_car(owner);
        let car_b = fx.store.add_car(owner);

        let accepted = book(&fx, agent, car_a, "2024-02-01", "2024-02-05").await;
        fx.engine.respond(&accepted.to_string(), true).await.unwrap();
        let rejected = book(&fx, agent, car_b, "2024-03-01", "2024-03-05").await;
        fx.engine.respond(&rejected.to_string(), false).await.unwrap();

        let rows = fx.queries.list(&owner.to_string(), true).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].booking.id, accepted);
    }

    #[tokio::test]
    async fn owner_without_cars_gets_empty_list() {
        let fx = fixture();
        let owner = fx.store.add_user(UserRole::Owner);

        let rows = fx.queries.list(&owner.to_string(), true).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let fx = fixture();
        let err = fx
            .queries
            .list(&Uuid::new_v4().to_string(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound("user")));
    }

    #[tokio::test]
    async fn malformed_user_id_is_a_validation_error() {
        let fx = fixture();
        let err = fx.queries.list("nope", false).await.unwrap_err();
        match err {
            DomainError::Validation(errors) => assert!(errors.contains_key("user_id")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
