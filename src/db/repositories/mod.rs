mod bookings;
mod reports;
mod users;
