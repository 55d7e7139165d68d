pub mod manager;
pub mod overlap;


pub use manager::BookingService;
pub use overlap::{OverlapPolicy, RideWindow, RIDE_DURATION_MINUTES};
