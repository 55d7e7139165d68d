//! Booking lifecycle orchestration.
//!
//! `BookingService` validates inputs, runs the conflict scan where a
//! transition binds a driver to a slot, and delegates the actual
//! read-validate-write to the repositories. It holds no booking state of
//! its own: every call re-reads the store.

use chrono::{NaiveDate, NaiveTime};
use log::{info, warn};

use crate::booking::overlap::OverlapPolicy;
use crate::db::{
    models::{AssignedRide, Booking, BookingInput, BookingOverview},
    Database,
};
use crate::error::{Result, ValidationError};

#[derive(Clone)]
pub struct BookingService {
    db: Database,
    policy: OverlapPolicy,
}

impl BookingService {
    pub fn new(db: Database, policy: OverlapPolicy) -> Self {
        Self { db, policy }
    }

    pub fn policy(&self) -> OverlapPolicy {
        self.policy
    }

    /// Trim and check a ride request. Order matters: missing fields are
    /// reported before format problems, field by field.
    fn validated(input: &BookingInput) -> Result<BookingInput> {
        let pickup_location = input.pickup_location.trim();
        if pickup_location.is_empty() {
            return Err(ValidationError::Required("pickup location").into());
        }
        let dropoff_location = input.dropoff_location.trim();
        if dropoff_location.is_empty() {
            return Err(ValidationError::Required("dropoff location").into());
        }
        let booking_date = input.booking_date.trim();
        if booking_date.is_empty() {
            return Err(ValidationError::Required("date").into());
        }
        let booking_time = input.booking_time.trim();
        if booking_time.is_empty() {
            return Err(ValidationError::Required("time").into());
        }

        if NaiveDate::parse_from_str(booking_date, "%Y-%m-%d").is_err() {
            return Err(ValidationError::BadDate.into());
        }
        if NaiveTime::parse_from_str(booking_time, "%H:%M").is_err() {
            return Err(ValidationError::BadTime.into());
        }

        Ok(BookingInput {
            pickup_location: pickup_location.to_string(),
            dropoff_location: dropoff_location.to_string(),
            booking_date: booking_date.to_string(),
            booking_time: booking_time.to_string(),
        })
    }

    pub async fn create_booking(&self, customer_id: i64, input: BookingInput) -> Result<Booking> {
        let input = Self::validated(&input)?;
        let booking = self.db.create_booking(customer_id, input).await?;
        info!(
            "Customer {customer_id} created booking {} for {} {}",
            booking.id, booking.booking_date, booking.booking_time
        );
        Ok(booking)
    }

    pub async fn bookings_for_customer(&self, customer_id: i64) -> Result<Vec<Booking>> {
        self.db.bookings_for_customer(customer_id).await
    }

    pub async fn rides_for_driver(&self, driver_id: i64) -> Result<Vec<AssignedRide>> {
        self.db.rides_for_driver(driver_id).await
    }

    pub async fn booking_overview(&self) -> Result<Vec<BookingOverview>> {
        self.db.list_bookings().await
    }

    /// Would this driver be double-booked at the given slot?
    ///
    /// Storage failures are resolved per the configured policy: fail-open
    /// answers "no overlap", fail-closed propagates the error.
    pub async fn has_overlap(
        &self,
        driver_id: i64,
        date: &str,
        time: &str,
        exclude_booking_id: Option<i64>,
    ) -> Result<bool> {
        let outcome = self
            .db
            .driver_has_conflict(
                driver_id,
                date.to_string(),
                time.to_string(),
                exclude_booking_id,
            )
            .await;

        match outcome {
            Ok(found) => Ok(found),
            Err(err) => match self.policy {
                OverlapPolicy::FailOpen => {
                    warn!("Conflict scan for driver {driver_id} failed: {err}; assuming free");
                    Ok(false)
                }
                OverlapPolicy::FailClosed => Err(err),
            },
        }
    }

    pub async fn assign_driver(&self, booking_id: i64, driver_id: i64) -> Result<Booking> {
        let booking = self
            .db
            .assign_driver(booking_id, driver_id, self.policy)
            .await?;
        info!("Assigned driver {driver_id} to booking {booking_id}");
        Ok(booking)
    }

    /// The stated reason is required but only logged; nothing in the row
    /// records why a ride came back.
    pub async fn decline_ride(
        &self,
        booking_id: i64,
        driver_id: i64,
        reason: &str,
    ) -> Result<Booking> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ValidationError::Required("reason").into());
        }

        let booking = self.db.decline_ride(booking_id, driver_id).await?;
        info!("Driver {driver_id} declined booking {booking_id}: {reason}");
        Ok(booking)
    }

    pub async fn complete_ride(&self, booking_id: i64, driver_id: i64) -> Result<Booking> {
        let booking = self.db.complete_ride(booking_id, driver_id).await?;
        info!("Driver {driver_id} completed booking {booking_id}");
        Ok(booking)
    }

    pub async fn cancel_booking(&self, booking_id: i64, customer_id: i64) -> Result<Booking> {
        let booking = self.db.cancel_booking(booking_id, customer_id).await?;
        info!("Customer {customer_id} cancelled booking {booking_id}");
        Ok(booking)
    }

    pub async fn edit_booking(
        &self,
        booking_id: i64,
        customer_id: i64,
        input: BookingInput,
    ) -> Result<Booking> {
        let input = Self::validated(&input)?;
        self.db
            .update_booking(booking_id, customer_id, input, self.policy)
            .await
    }

    pub async fn delete_booking(&self, booking_id: i64) -> Result<()> {
        self.db.delete_booking(booking_id).await?;
        info!("Deleted booking {booking_id}");
        Ok(())
    }

    pub async fn get_booking(&self, booking_id: i64) -> Result<Option<Booking>> {
        self.db.get_booking(booking_id).await
    }
}
