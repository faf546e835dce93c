use std::borrow::Cow;

use validator::ValidationError;

pub const BOOKING_STATUSES: [&str; 4] = ["pending", "confirmed", "cancelled", "completed"];

/// Checks if a string might be a valid phone number: digits with an optional
/// leading `+`, spaces and dashes allowed, 7 to 15 digits in total.
pub fn is_valid_phone(phone: &str) -> bool {
    let trimmed = phone.trim();
    let body = trimmed.strip_prefix('+').unwrap_or(trimmed);
    if !body.chars().all(|c| c.is_ascii_digit() || c == ' ' || c == '-') {
        return false;
    }
    let digits = body.chars().filter(char::is_ascii_digit).count();
    (7..=15).contains(&digits)
}

pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if is_valid_phone(phone) {
        Ok(())
    } else {
        Err(ValidationError::new("phone").with_message(Cow::from("invalid phone number")))
    }
}

pub fn validate_booking_status(status: &str) -> Result<(), ValidationError> {
    if BOOKING_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(ValidationError::new("status").with_message(Cow::from("unknown booking status")))
    }
}
