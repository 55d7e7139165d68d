use chrono::{DateTime, NaiveDateTime, Utc};

use crate::db::models::{BookingStatus, Role};
use crate::error::{Result, ServiceError};

/// Rows written by this crate carry RFC 3339 timestamps; rows created by
/// the v1 schema's `DEFAULT CURRENT_TIMESTAMP` carry SQLite's
/// `YYYY-MM-DD HH:MM:SS` shape (UTC). Accept both.
pub fn parse_timestamp(value: &str, field: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|_| ServiceError::Storage(format!("failed to parse {field}: {value:?}")))
}

/// Case-insensitive: rows written by earlier versions of the app stored
/// capitalized roles.
pub fn parse_role(value: &str) -> Result<Role> {
    match value.to_ascii_lowercase().as_str() {
        "customer" => Ok(Role::Customer),
        "driver" => Ok(Role::Driver),
        "admin" => Ok(Role::Admin),
        other => Err(ServiceError::Storage(format!("unknown role {other}"))),
    }
}

pub fn parse_booking_status(value: &str) -> Result<BookingStatus> {
    match value {
        "pending" => Ok(BookingStatus::Pending),
        "assigned" => Ok(BookingStatus::Assigned),
        "completed" => Ok(BookingStatus::Completed),
        "cancelled" => Ok(BookingStatus::Cancelled),
        other => Err(ServiceError::Storage(format!(
            "unknown booking status {other}"
        ))),
    }
}
