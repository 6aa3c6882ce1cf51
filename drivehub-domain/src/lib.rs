pub mod booking;
pub mod car;
pub mod engine;
pub mod error;
pub mod query;
pub mod repository;
pub mod user;
pub mod validate;

pub use booking::{Booking, BookingDetails, BookingStatus, NewBooking};
pub use car::Car;
pub use engine::BookingEngine;
pub use error::{DomainError, FieldErrors, StoreError};
pub use query::BookingQueries;
pub use user::{User, UserRole, UserSummary};

#[cfg(test)]
pub(crate) mod support;
