//! Role-scoped session views.
//!
//! One session is opened per sign-in; the enum variant fixes which
//! operations are reachable for the rest of the session. Customer and
//! driver sessions carry the signed-in user's id and scope every call
//! with it; the admin session works across all users and bookings.

use std::fmt;

use crate::auth::AuthenticatedUser;
use crate::booking::BookingService;
use crate::db::{
    models::{AssignedRide, Booking, BookingInput, BookingOverview, Role, UsageReport, User},
    Database,
};
use crate::error::{Result, ServiceError};

pub enum RoleSession {
    Customer(CustomerSession),
    Driver(DriverSession),
    Admin(AdminSession),
}

impl RoleSession {
    pub fn open(identity: AuthenticatedUser, db: Database, bookings: BookingService) -> Self {
        match identity.role {
            Role::Customer => RoleSession::Customer(CustomerSession {
                user_id: identity.user_id,
                name: identity.name,
                bookings,
            }),
            Role::Driver => RoleSession::Driver(DriverSession {
                driver_id: identity.user_id,
                name: identity.name,
                bookings,
            }),
            Role::Admin => RoleSession::Admin(AdminSession {
                name: identity.name,
                db,
                bookings,
            }),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            RoleSession::Customer(_) => Role::Customer,
            RoleSession::Driver(_) => Role::Driver,
            RoleSession::Admin(_) => Role::Admin,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            RoleSession::Customer(session) => &session.name,
            RoleSession::Driver(session) => &session.name,
            RoleSession::Admin(session) => &session.name,
        }
    }
}

// The session payloads hold live service handles, so Debug is written by
// hand and prints the identity only.
impl fmt::Debug for RoleSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoleSession")
            .field("role", &self.role())
            .field("name", &self.name())
            .finish()
    }
}

pub struct CustomerSession {
    user_id: i64,
    name: String,
    bookings: BookingService,
}

impl CustomerSession {
    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub async fn book(&self, input: BookingInput) -> Result<Booking> {
        self.bookings.create_booking(self.user_id, input).await
    }

    pub async fn my_bookings(&self) -> Result<Vec<Booking>> {
        self.bookings.bookings_for_customer(self.user_id).await
    }

    pub async fn edit_booking(&self, booking_id: i64, input: BookingInput) -> Result<Booking> {
        self.bookings
            .edit_booking(booking_id, self.user_id, input)
            .await
    }

    pub async fn cancel_booking(&self, booking_id: i64) -> Result<Booking> {
        self.bookings.cancel_booking(booking_id, self.user_id).await
    }
}

pub struct DriverSession {
    driver_id: i64,
    name: String,
    bookings: BookingService,
}

impl DriverSession {
    pub fn driver_id(&self) -> i64 {
        self.driver_id
    }

    pub async fn my_rides(&self) -> Result<Vec<AssignedRide>> {
        self.bookings.rides_for_driver(self.driver_id).await
    }

    pub async fn decline_ride(&self, booking_id: i64, reason: &str) -> Result<Booking> {
        self.bookings
            .decline_ride(booking_id, self.driver_id, reason)
            .await
    }

    pub async fn complete_ride(&self, booking_id: i64) -> Result<Booking> {
        self.bookings.complete_ride(booking_id, self.driver_id).await
    }
}

pub struct AdminSession {
    name: String,
    db: Database,
    bookings: BookingService,
}

impl AdminSession {
    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.db.list_users().await
    }

    /// Delete an account along with its customer bookings; rides it was
    /// driving go back to the pending pool.
    pub async fn delete_user(&self, user_id: i64) -> Result<()> {
        self.db.delete_user(user_id).await
    }

    /// Drivers offered in the assignment workflow, by name. Errors when
    /// no driver accounts exist at all.
    pub async fn assignable_drivers(&self) -> Result<Vec<User>> {
        let drivers = self.db.list_drivers().await?;
        if drivers.is_empty() {
            return Err(ServiceError::NoDriversAvailable);
        }
        Ok(drivers)
    }

    pub async fn assign_driver(&self, booking_id: i64, driver_id: i64) -> Result<Booking> {
        self.bookings.assign_driver(booking_id, driver_id).await
    }

    pub async fn has_overlap(
        &self,
        driver_id: i64,
        date: &str,
        time: &str,
        exclude_booking_id: Option<i64>,
    ) -> Result<bool> {
        self.bookings
            .has_overlap(driver_id, date, time, exclude_booking_id)
            .await
    }

    pub async fn all_bookings(&self) -> Result<Vec<BookingOverview>> {
        self.bookings.booking_overview().await
    }

    pub async fn delete_booking(&self, booking_id: i64) -> Result<()> {
        self.bookings.delete_booking(booking_id).await
    }

    pub async fn usage_report(&self) -> Result<UsageReport> {
        self.db.usage_report().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthService;
    use crate::booking::OverlapPolicy;
    use crate::db::models::NewUser;

    async fn open_session(db: &Database, email: &str, role: Role) -> RoleSession {
        let auth = AuthService::new(db.clone());
        auth.register(NewUser {
            email: email.to_string(),
            password: "secret99".to_string(),
            name: email.split('@').next().unwrap_or("user").to_string(),
            address: "5 Depot Street".to_string(),
            phone: "0700000000".to_string(),
            role,
        })
        .await
        .unwrap();

        let identity = auth.verify(email, "secret99").await.unwrap();
        let bookings = BookingService::new(db.clone(), OverlapPolicy::FailOpen);
        RoleSession::open(identity, db.clone(), bookings)
    }

    fn input(date: &str, time: &str) -> BookingInput {
        BookingInput {
            pickup_location: "Airport".to_string(),
            dropoff_location: "Town Hall".to_string(),
            booking_date: date.to_string(),
            booking_time: time.to_string(),
        }
    }

    #[tokio::test]
    async fn sessions_open_by_role() {
        let db = Database::open_in_memory().unwrap();

        let session = open_session(&db, "cust@example.com", Role::Customer).await;
        assert_eq!(session.role(), Role::Customer);
        assert_eq!(session.name(), "cust");

        let session = open_session(&db, "drv@example.com", Role::Driver).await;
        assert!(matches!(session, RoleSession::Driver(_)));

        let session = open_session(&db, "adm@example.com", Role::Admin).await;
        assert!(matches!(session, RoleSession::Admin(_)));
    }

    #[tokio::test]
    async fn sessions_debug_as_role_and_name() {
        let db = Database::open_in_memory().unwrap();

        let session = open_session(&db, "ops@example.com", Role::Driver).await;
        let printed = format!("{session:?}");
        assert!(printed.contains("Driver"));
        assert!(printed.contains("ops"));
    }

    #[tokio::test]
    async fn customer_session_scopes_to_its_own_user() {
        let db = Database::open_in_memory().unwrap();

        let customer = match open_session(&db, "mona@example.com", Role::Customer).await {
            RoleSession::Customer(session) => session,
            _ => unreachable!(),
        };

        let booking = customer.book(input("2024-06-01", "10:00")).await.unwrap();
        assert_eq!(booking.customer_id, customer.user_id());

        let mine = customer.my_bookings().await.unwrap();
        assert_eq!(mine.len(), 1);

        customer.cancel_booking(booking.id).await.unwrap();
        let mine = customer.my_bookings().await.unwrap();
        assert_eq!(mine[0].status, crate::db::models::BookingStatus::Cancelled);
    }

    #[tokio::test]
    async fn assignment_workflow_requires_a_driver_pool() {
        let db = Database::open_in_memory().unwrap();

        let admin = match open_session(&db, "boss@example.com", Role::Admin).await {
            RoleSession::Admin(session) => session,
            _ => unreachable!(),
        };

        let err = admin.assignable_drivers().await.unwrap_err();
        assert!(matches!(err, ServiceError::NoDriversAvailable));

        open_session(&db, "pat@example.com", Role::Driver).await;
        let drivers = admin.assignable_drivers().await.unwrap();
        assert_eq!(drivers.len(), 1);
        assert_eq!(drivers[0].name, "pat");
    }

    #[tokio::test]
    async fn driver_session_works_its_own_rides() {
        let db = Database::open_in_memory().unwrap();

        let customer = match open_session(&db, "kit@example.com", Role::Customer).await {
            RoleSession::Customer(session) => session,
            _ => unreachable!(),
        };
        let driver = match open_session(&db, "gil@example.com", Role::Driver).await {
            RoleSession::Driver(session) => session,
            _ => unreachable!(),
        };
        let admin = match open_session(&db, "hq@example.com", Role::Admin).await {
            RoleSession::Admin(session) => session,
            _ => unreachable!(),
        };

        let booking = customer.book(input("2024-06-01", "10:00")).await.unwrap();
        admin.assign_driver(booking.id, driver.driver_id()).await.unwrap();

        let rides = driver.my_rides().await.unwrap();
        assert_eq!(rides.len(), 1);
        assert_eq!(rides[0].customer_name, "kit");

        let done = driver.complete_ride(booking.id).await.unwrap();
        assert_eq!(done.status, crate::db::models::BookingStatus::Completed);
    }
}
