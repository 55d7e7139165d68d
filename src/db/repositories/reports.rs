use rusqlite::Connection;

use crate::db::{connection::Database, models::UsageReport};
use crate::error::Result;

fn count(conn: &Connection, sql: &str) -> rusqlite::Result<i64> {
    conn.query_row(sql, [], |row| row.get(0))
}

impl Database {
    /// Headline counts for the admin dashboard. All seven numbers come
    /// from the same DB task, so they describe one moment in time.
    pub async fn usage_report(&self) -> Result<UsageReport> {
        self.execute(|conn| {
            let report = UsageReport {
                total_customers: count(conn, "SELECT COUNT(*) FROM users WHERE LOWER(role) = 'customer'")?,
                total_drivers: count(conn, "SELECT COUNT(*) FROM users WHERE LOWER(role) = 'driver'")?,
                total_bookings: count(conn, "SELECT COUNT(*) FROM bookings")?,
                pending: count(conn, "SELECT COUNT(*) FROM bookings WHERE status = 'pending'")?,
                assigned: count(conn, "SELECT COUNT(*) FROM bookings WHERE status = 'assigned'")?,
                completed: count(conn, "SELECT COUNT(*) FROM bookings WHERE status = 'completed'")?,
                cancelled: count(conn, "SELECT COUNT(*) FROM bookings WHERE status = 'cancelled'")?,
            };

            Ok(report)
        })
        .await
    }
}
