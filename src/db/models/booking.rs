//! Booking data models.
//!
//! `Booking` mirrors a row of the bookings table; the other structs are
//! per-role projections produced by the repository joins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Assigned,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Assigned => "assigned",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: i64,
    pub customer_id: i64,
    pub driver_id: Option<i64>,
    pub pickup_location: String,
    pub dropoff_location: String,
    /// `YYYY-MM-DD`, as entered.
    pub booking_date: String,
    /// `HH:MM` 24-hour, as entered.
    pub booking_time: String,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

/// Input data for creating or editing a booking
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingInput {
    pub pickup_location: String,
    pub dropoff_location: String,
    pub booking_date: String,
    pub booking_time: String,
}

/// Admin overview row: every booking with its customer and, when
/// assigned, driver name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingOverview {
    pub id: i64,
    pub customer_name: String,
    pub driver_name: Option<String>,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub booking_date: String,
    pub booking_time: String,
    pub status: BookingStatus,
}

/// Driver view of an assigned booking, joined with the customer's
/// contact details.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedRide {
    pub id: i64,
    pub customer_name: String,
    pub customer_phone: String,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub booking_date: String,
    pub booking_time: String,
    pub status: BookingStatus,
}
