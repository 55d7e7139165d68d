use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::booking::overlap::{OverlapPolicy, RideWindow};
use crate::db::{
    connection::Database,
    helpers::{parse_booking_status, parse_role, parse_timestamp},
    models::{AssignedRide, Booking, BookingInput, BookingOverview, BookingStatus, Role},
};
use crate::error::{Result, ServiceError};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

fn row_to_booking(row: &Row) -> Result<Booking> {
    let status: String = row.get("status")?;
    let created_at: String = row.get("created_at")?;

    Ok(Booking {
        id: row.get("id")?,
        customer_id: row.get("user_id")?,
        driver_id: row.get("driver_id")?,
        pickup_location: row.get("pickup_location")?,
        dropoff_location: row.get("dropoff_location")?,
        booking_date: row.get("booking_date")?,
        booking_time: row.get("booking_time")?,
        status: parse_booking_status(&status)?,
        created_at: parse_timestamp(&created_at, "created_at")?,
    })
}

const BOOKING_COLUMNS: &str = "id, user_id, driver_id, pickup_location, dropoff_location,
     booking_date, booking_time, status, created_at";

fn fetch_booking(conn: &Connection, booking_id: i64) -> Result<Option<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"
    ))?;

    let mut rows = stmt.query(params![booking_id])?;
    let booking = match rows.next()? {
        Some(row) => Some(row_to_booking(row)?),
        None => None,
    };
    Ok(booking)
}

/// Scan the driver's active bookings for a window that intersects the
/// candidate slot. Only pending and assigned rows occupy the schedule;
/// completed and cancelled ones never block anything.
///
/// An unparseable candidate slot means there is nothing to compare
/// against, and unparseable stored slots are skipped row by row, so bad
/// historical data cannot wedge the assignment workflow.
fn driver_slot_conflicts(
    conn: &Connection,
    driver_id: i64,
    date: &str,
    time: &str,
    exclude_booking_id: Option<i64>,
) -> rusqlite::Result<bool> {
    let candidate = match RideWindow::parse(date, time) {
        Some(window) => window,
        None => {
            log_warn!("Candidate slot {date:?} {time:?} does not parse; skipping conflict scan");
            return Ok(false);
        }
    };

    let mut sql = String::from(
        "SELECT id, booking_date, booking_time
         FROM bookings
         WHERE driver_id = ? AND status IN ('pending', 'assigned')",
    );
    let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(driver_id)];
    if let Some(exclude_id) = exclude_booking_id {
        sql.push_str(" AND id != ?");
        params_vec.push(Box::new(exclude_id));
    }

    let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|b| b.as_ref()).collect();

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_refs.as_slice())?;
    while let Some(row) = rows.next()? {
        let id: i64 = row.get(0)?;
        let row_date: String = row.get(1)?;
        let row_time: String = row.get(2)?;

        let existing = match RideWindow::parse(&row_date, &row_time) {
            Some(window) => window,
            None => {
                log_warn!("Booking {id} has unparseable slot {row_date:?} {row_time:?}; skipped");
                continue;
            }
        };

        if candidate.overlaps(&existing) {
            log_info!("Driver {driver_id} conflict: booking {id} occupies {row_date} {row_time}");
            return Ok(true);
        }
    }

    Ok(false)
}

/// Apply the configured policy to a conflict-scan outcome.
fn resolve_scan(
    scan: rusqlite::Result<bool>,
    driver_id: i64,
    policy: OverlapPolicy,
) -> Result<bool> {
    match scan {
        Ok(found) => Ok(found),
        Err(err) => match policy {
            OverlapPolicy::FailOpen => {
                log::warn!("Conflict scan for driver {driver_id} failed: {err}; assuming free");
                Ok(false)
            }
            OverlapPolicy::FailClosed => Err(err.into()),
        },
    }
}

impl Database {
    /// Create a booking for a customer. New bookings start pending with
    /// no driver.
    pub async fn create_booking(&self, customer_id: i64, input: BookingInput) -> Result<Booking> {
        self.execute(move |conn| {
            let customer: Option<i64> = conn
                .query_row(
                    "SELECT id FROM users WHERE id = ?1",
                    params![customer_id],
                    |row| row.get(0),
                )
                .optional()?;
            if customer.is_none() {
                return Err(ServiceError::UserNotFound(customer_id));
            }

            conn.execute(
                "INSERT INTO bookings (user_id, pickup_location, dropoff_location,
                                       booking_date, booking_time, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    customer_id,
                    input.pickup_location,
                    input.dropoff_location,
                    input.booking_date,
                    input.booking_time,
                    BookingStatus::Pending.as_str(),
                    Utc::now().to_rfc3339(),
                ],
            )?;

            let booking_id = conn.last_insert_rowid();
            match fetch_booking(conn, booking_id)? {
                Some(booking) => Ok(booking),
                None => Err(ServiceError::Storage(
                    "booking not found after insert".into(),
                )),
            }
        })
        .await
    }

    pub async fn get_booking(&self, booking_id: i64) -> Result<Option<Booking>> {
        self.execute(move |conn| fetch_booking(conn, booking_id)).await
    }

    /// A customer's own bookings, newest first.
    pub async fn bookings_for_customer(&self, customer_id: i64) -> Result<Vec<Booking>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {BOOKING_COLUMNS}
                 FROM bookings
                 WHERE user_id = ?1
                 ORDER BY created_at DESC"
            ))?;

            let mut rows = stmt.query(params![customer_id])?;
            let mut bookings = Vec::new();
            while let Some(row) = rows.next()? {
                bookings.push(row_to_booking(row)?);
            }

            Ok(bookings)
        })
        .await
    }

    /// Rides currently carrying this driver (assigned and completed),
    /// joined with the customer's contact details, newest first.
    pub async fn rides_for_driver(&self, driver_id: i64) -> Result<Vec<AssignedRide>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT b.id, u.name, u.phone, b.pickup_location, b.dropoff_location,
                        b.booking_date, b.booking_time, b.status
                 FROM bookings b
                 JOIN users u ON u.id = b.user_id
                 WHERE b.driver_id = ?1
                 ORDER BY b.created_at DESC",
            )?;

            let mut rows = stmt.query(params![driver_id])?;
            let mut rides = Vec::new();
            while let Some(row) = rows.next()? {
                let status: String = row.get(7)?;
                rides.push(AssignedRide {
                    id: row.get(0)?,
                    customer_name: row.get(1)?,
                    customer_phone: row.get(2)?,
                    pickup_location: row.get(3)?,
                    dropoff_location: row.get(4)?,
                    booking_date: row.get(5)?,
                    booking_time: row.get(6)?,
                    status: parse_booking_status(&status)?,
                });
            }

            Ok(rides)
        })
        .await
    }

    /// Every booking with customer and driver names, newest first.
    pub async fn list_bookings(&self) -> Result<Vec<BookingOverview>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT b.id, c.name, d.name, b.pickup_location, b.dropoff_location,
                        b.booking_date, b.booking_time, b.status
                 FROM bookings b
                 JOIN users c ON c.id = b.user_id
                 LEFT JOIN users d ON d.id = b.driver_id
                 ORDER BY b.created_at DESC",
            )?;

            let mut rows = stmt.query([])?;
            let mut bookings = Vec::new();
            while let Some(row) = rows.next()? {
                let status: String = row.get(7)?;
                bookings.push(BookingOverview {
                    id: row.get(0)?,
                    customer_name: row.get(1)?,
                    driver_name: row.get(2)?,
                    pickup_location: row.get(3)?,
                    dropoff_location: row.get(4)?,
                    booking_date: row.get(5)?,
                    booking_time: row.get(6)?,
                    status: parse_booking_status(&status)?,
                });
            }

            Ok(bookings)
        })
        .await
    }

    /// Run the conflict scan on its own, outside any transition.
    pub async fn driver_has_conflict(
        &self,
        driver_id: i64,
        date: String,
        time: String,
        exclude_booking_id: Option<i64>,
    ) -> Result<bool> {
        self.execute(move |conn| {
            Ok(driver_slot_conflicts(
                conn,
                driver_id,
                &date,
                &time,
                exclude_booking_id,
            )?)
        })
        .await
    }

    /// Bind a driver to a pending booking. The booking's slot is checked
    /// against the driver's schedule inside the same transaction; on any
    /// refusal the booking is left untouched.
    pub async fn assign_driver(
        &self,
        booking_id: i64,
        driver_id: i64,
        policy: OverlapPolicy,
    ) -> Result<Booking> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            let booking = match fetch_booking(&tx, booking_id)? {
                Some(booking) => booking,
                None => return Err(ServiceError::BookingNotFound(booking_id)),
            };
            if booking.status != BookingStatus::Pending {
                return Err(ServiceError::WrongStatus {
                    id: booking_id,
                    found: booking.status,
                    expected: BookingStatus::Pending,
                });
            }
            if booking.driver_id.is_some() {
                return Err(ServiceError::DriverAlreadySet(booking_id));
            }

            let role: Option<String> = tx
                .query_row(
                    "SELECT role FROM users WHERE id = ?1",
                    params![driver_id],
                    |row| row.get(0),
                )
                .optional()?;
            let role = match role {
                Some(raw) => parse_role(&raw)?,
                None => return Err(ServiceError::UserNotFound(driver_id)),
            };
            if role != Role::Driver {
                return Err(ServiceError::NotADriver {
                    id: driver_id,
                    found: role,
                });
            }

            let scan = driver_slot_conflicts(
                &tx,
                driver_id,
                &booking.booking_date,
                &booking.booking_time,
                Some(booking_id),
            );
            if resolve_scan(scan, driver_id, policy)? {
                return Err(ServiceError::DriverConflict {
                    driver_id,
                    date: booking.booking_date,
                    time: booking.booking_time,
                });
            }

            let rows_affected = tx.execute(
                "UPDATE bookings SET driver_id = ?1, status = ?2 WHERE id = ?3",
                params![driver_id, BookingStatus::Assigned.as_str(), booking_id],
            )?;
            if rows_affected == 0 {
                return Err(ServiceError::BookingNotFound(booking_id));
            }

            let updated = match fetch_booking(&tx, booking_id)? {
                Some(booking) => booking,
                None => return Err(ServiceError::BookingNotFound(booking_id)),
            };
            tx.commit()?;

            Ok(updated)
        })
        .await
    }

    /// A driver hands an assigned ride back: the driver column is cleared
    /// and the booking returns to the pending pool.
    pub async fn decline_ride(&self, booking_id: i64, driver_id: i64) -> Result<Booking> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            let booking = match fetch_booking(&tx, booking_id)? {
                Some(booking) if booking.driver_id == Some(driver_id) => booking,
                _ => return Err(ServiceError::BookingNotFound(booking_id)),
            };
            if booking.status != BookingStatus::Assigned {
                return Err(ServiceError::WrongStatus {
                    id: booking_id,
                    found: booking.status,
                    expected: BookingStatus::Assigned,
                });
            }

            tx.execute(
                "UPDATE bookings SET driver_id = NULL, status = ?1 WHERE id = ?2",
                params![BookingStatus::Pending.as_str(), booking_id],
            )?;

            let updated = match fetch_booking(&tx, booking_id)? {
                Some(booking) => booking,
                None => return Err(ServiceError::BookingNotFound(booking_id)),
            };
            tx.commit()?;

            Ok(updated)
        })
        .await
    }

    /// Mark an assigned ride as carried out. The driver stays on the row
    /// for the record.
    pub async fn complete_ride(&self, booking_id: i64, driver_id: i64) -> Result<Booking> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            let booking = match fetch_booking(&tx, booking_id)? {
                Some(booking) if booking.driver_id == Some(driver_id) => booking,
                _ => return Err(ServiceError::BookingNotFound(booking_id)),
            };
            if booking.status != BookingStatus::Assigned {
                return Err(ServiceError::WrongStatus {
                    id: booking_id,
                    found: booking.status,
                    expected: BookingStatus::Assigned,
                });
            }

            tx.execute(
                "UPDATE bookings SET status = ?1 WHERE id = ?2",
                params![BookingStatus::Completed.as_str(), booking_id],
            )?;

            let updated = match fetch_booking(&tx, booking_id)? {
                Some(booking) => booking,
                None => return Err(ServiceError::BookingNotFound(booking_id)),
            };
            tx.commit()?;

            Ok(updated)
        })
        .await
    }

    /// A customer withdraws a booking that has not been assigned yet.
    pub async fn cancel_booking(&self, booking_id: i64, customer_id: i64) -> Result<Booking> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            let booking = match fetch_booking(&tx, booking_id)? {
                Some(booking) if booking.customer_id == customer_id => booking,
                _ => return Err(ServiceError::BookingNotFound(booking_id)),
            };
            if booking.status != BookingStatus::Pending {
                return Err(ServiceError::WrongStatus {
                    id: booking_id,
                    found: booking.status,
                    expected: BookingStatus::Pending,
                });
            }

            tx.execute(
                "UPDATE bookings SET status = ?1 WHERE id = ?2",
                params![BookingStatus::Cancelled.as_str(), booking_id],
            )?;

            let updated = match fetch_booking(&tx, booking_id)? {
                Some(booking) => booking,
                None => return Err(ServiceError::BookingNotFound(booking_id)),
            };
            tx.commit()?;

            Ok(updated)
        })
        .await
    }

    /// Overwrite the ride details of a customer's pending booking. Rows
    /// that somehow carry a driver while pending are re-checked against
    /// that driver's schedule at the new slot; the store is shared with
    /// other writers and such rows do turn up.
    pub async fn update_booking(
        &self,
        booking_id: i64,
        customer_id: i64,
        input: BookingInput,
        policy: OverlapPolicy,
    ) -> Result<Booking> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            let booking = match fetch_booking(&tx, booking_id)? {
                Some(booking) if booking.customer_id == customer_id => booking,
                _ => return Err(ServiceError::BookingNotFound(booking_id)),
            };
            if booking.status != BookingStatus::Pending {
                return Err(ServiceError::WrongStatus {
                    id: booking_id,
                    found: booking.status,
                    expected: BookingStatus::Pending,
                });
            }

            if let Some(driver_id) = booking.driver_id {
                let scan = driver_slot_conflicts(
                    &tx,
                    driver_id,
                    &input.booking_date,
                    &input.booking_time,
                    Some(booking_id),
                );
                if resolve_scan(scan, driver_id, policy)? {
                    return Err(ServiceError::DriverConflict {
                        driver_id,
                        date: input.booking_date,
                        time: input.booking_time,
                    });
                }
            }

            let rows_affected = tx.execute(
                "UPDATE bookings
                 SET pickup_location = ?1,
                     dropoff_location = ?2,
                     booking_date = ?3,
                     booking_time = ?4
                 WHERE id = ?5",
                params![
                    input.pickup_location,
                    input.dropoff_location,
                    input.booking_date,
                    input.booking_time,
                    booking_id,
                ],
            )?;
            if rows_affected == 0 {
                return Err(ServiceError::BookingNotFound(booking_id));
            }

            let updated = match fetch_booking(&tx, booking_id)? {
                Some(booking) => booking,
                None => return Err(ServiceError::BookingNotFound(booking_id)),
            };
            tx.commit()?;

            Ok(updated)
        })
        .await
    }

    /// Remove a booking outright. Admin only; every other path leaves a
    /// terminal row behind instead.
    pub async fn delete_booking(&self, booking_id: i64) -> Result<()> {
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "DELETE FROM bookings WHERE id = ?1",
                params![booking_id],
            )?;

            if rows_affected == 0 {
                return Err(ServiceError::BookingNotFound(booking_id));
            }

            Ok(())
        })
        .await
    }
}
