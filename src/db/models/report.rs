//! Usage report model for the admin dashboard.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageReport {
    pub total_customers: i64,
    pub total_drivers: i64,
    pub total_bookings: i64,
    pub pending: i64,
    pub assigned: i64,
    pub completed: i64,
    pub cancelled: i64,
}
