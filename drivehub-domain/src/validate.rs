use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::FieldErrors;

/// Raw creation payload as it arrives off the wire. Everything is a
/// string until validated.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookingPayload {
    pub start_date: String,
    pub end_date: String,
    pub user_id: String,
    pub car_id: String,
}

/// Payload that passed every shape check. Existence of the user and car
/// is the engine's concern, not the validator's.
#[derive(Debug, Clone, Copy)]
pub struct ValidBooking {
    pub user_id: Uuid,
    pub car_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

const DATE_FORMAT_MSG: &str = "Invalid date format. Date must be in yyyy-mm-dd format.";
const ID_FORMAT_MSG: &str = "Invalid id format.";

/// Checks every field and collects one message per invalid field rather
/// than stopping at the first failure.
pub fn validate(payload: &CreateBookingPayload) -> Result<ValidBooking, FieldErrors> {
    let mut errors = FieldErrors::new();

    let start_date = parse_strict_date(&payload.start_date);
    if start_date.is_none() {
        errors.insert("start_date", DATE_FORMAT_MSG.to_string());
    }
    let end_date = parse_strict_date(&payload.end_date);
    if end_date.is_none() {
        errors.insert("end_date", DATE_FORMAT_MSG.to_string());
    }
    if let (Some(start), Some(end)) = (start_date, end_date) {
        if end < start {
            errors.insert("end_date", "End date must not be before start date.".to_string());
        }
    }

    let user_id = Uuid::parse_str(&payload.user_id).ok();
    if user_id.is_none() {
        errors.insert("user_id", ID_FORMAT_MSG.to_string());
    }
    let car_id = Uuid::parse_str(&payload.car_id).ok();
    if car_id.is_none() {
        errors.insert("car_id", ID_FORMAT_MSG.to_string());
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    // Unwraps are safe: every None inserted an error above.
    Ok(ValidBooking {
        user_id: user_id.unwrap(),
        car_id: car_id.unwrap(),
        start_date: start_date.unwrap(),
        end_date: end_date.unwrap(),
    })
}

/// Validates a single id field with the same field-keyed error shape as
/// the full payload validator.
pub fn parse_id(field: &'static str, value: &str) -> Result<Uuid, FieldErrors> {
    Uuid::parse_str(value).map_err(|_| {
        let mut errors = FieldErrors::new();
        errors.insert(field, ID_FORMAT_MSG.to_string());
        errors
    })
}

/// Strict `YYYY-MM-DD`: exact width, digits only, and a real calendar
/// date. `chrono` alone would accept single-digit months.
fn parse_strict_date(value: &str) -> Option<NaiveDate> {
    let bytes = value.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    let digits_ok = bytes
        .iter()
        .enumerate()
        .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !digits_ok {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}
