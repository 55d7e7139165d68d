use thiserror::Error;

use crate::db::models::{BookingStatus, Role};

pub type Result<T> = std::result::Result<T, ServiceError>;

/// Input validation failures. Each variant names the rule that failed;
/// nothing is written to the store when one of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("Invalid date format, use YYYY-MM-DD")]
    BadDate,

    #[error("Invalid time format, use HH:MM (24-hour)")]
    BadTime,

    #[error("Invalid email address")]
    BadEmail,

    #[error("Password must be at least 6 characters")]
    PasswordTooShort,

    #[error("Phone number must be at least 10 digits")]
    PhoneTooShort,
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Booking {0} not found")]
    BookingNotFound(i64),

    #[error("User {0} not found")]
    UserNotFound(i64),

    #[error("Booking {id} is {found}, expected {expected}")]
    WrongStatus {
        id: i64,
        found: BookingStatus,
        expected: BookingStatus,
    },

    #[error("User {id} has role {found}, not driver")]
    NotADriver { id: i64, found: Role },

    #[error("Booking {0} already has a driver assigned")]
    DriverAlreadySet(i64),

    #[error("This driver already has a booking at this time ({date} {time})")]
    DriverConflict {
        driver_id: i64,
        date: String,
        time: String,
    },

    #[error("No drivers available")]
    NoDriversAvailable,

    #[error("This email is already registered")]
    EmailTaken,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<rusqlite::Error> for ServiceError {
    fn from(err: rusqlite::Error) -> Self {
        ServiceError::Storage(err.to_string())
    }
}
