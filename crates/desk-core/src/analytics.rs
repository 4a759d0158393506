//! Per-tenant, per-day analytics rollup.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Metrics for one tenant on one day.
///
/// Counts are by each ticket's current status. Times are in hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    pub tenant_id: String,
    pub date: NaiveDate,

    pub total_tickets: u32,
    pub open_tickets: u32,
    pub resolved_tickets: u32,
    pub closed_tickets: u32,
    pub cancelled_tickets: u32,
    pub escalated_tickets: u32,

    pub avg_response_time: Option<f64>,
    pub avg_resolution_time: Option<f64>,
    pub satisfaction_avg: Option<f64>,
    pub escalation_rate: f64,

    pub active_staff_count: u32,
}

impl AnalyticsSnapshot {
    /// An all-zero snapshot.
    pub fn empty(tenant_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            date,
            total_tickets: 0,
            open_tickets: 0,
            resolved_tickets: 0,
            closed_tickets: 0,
            cancelled_tickets: 0,
            escalated_tickets: 0,
            avg_response_time: None,
            avg_resolution_time: None,
            satisfaction_avg: None,
            escalation_rate: 0.0,
            active_staff_count: 0,
        }
    }
}

/// Arithmetic mean, `None` for an empty input.
pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0u32), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / f64::from(n))
}
