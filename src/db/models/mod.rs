pub mod booking;
pub mod report;
pub mod user;

pub use booking::{AssignedRide, Booking, BookingInput, BookingOverview, BookingStatus};
pub use report::UsageReport;
pub use user::{NewUser, Role, User};
