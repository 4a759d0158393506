//! Analytics aggregator: per-tenant, per-day rollups.

use std::collections::HashSet;

use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeZone, Utc};
use tracing::info;

use desk_core::analytics::{AnalyticsSnapshot, mean};
use desk_core::enums::TicketStatus;
use desk_core::filter::TicketFilter;
use desk_core::message::EscalationRecord;
use desk_core::staff::StaffMember;
use desk_core::ticket::{Ticket, hours_between};

use crate::engine::Engine;
use crate::error::Result;

/// When a ticket left the working set: closed, or cancelled.
///
/// Cancellation is the last write a ticket receives, so `updated_at` is the
/// cancellation time.
fn finalized_at(ticket: &Ticket) -> Option<DateTime<Utc>> {
    match ticket.status {
        TicketStatus::Cancelled => Some(ticket.actual_resolution_time.unwrap_or(ticket.updated_at)),
        _ => ticket.actual_resolution_time,
    }
}

/// The status `ticket` had just before `at`, rebuilt from its timestamps.
///
/// Only the buckets a snapshot reports are distinguished, so every
/// not-yet-resolved state comes back as `Open`.
fn status_at(ticket: &Ticket, at: DateTime<Utc>) -> TicketStatus {
    if finalized_at(ticket).is_some_and(|f| f < at) {
        ticket.status
    } else if ticket.resolved_at.is_some_and(|r| r < at) {
        TicketStatus::Resolved
    } else {
        TicketStatus::Open
    }
}

/// Hours to resolution as known at `at`.
fn resolution_hours_at(ticket: &Ticket, at: DateTime<Utc>) -> Option<f64> {
    let resolved = match status_at(ticket, at) {
        TicketStatus::Closed => ticket.actual_resolution_time,
        TicketStatus::Resolved => ticket.resolved_at,
        _ => None,
    };
    resolved.map(|r| hours_between(ticket.created_at, r))
}

/// `[start, end)` of `date` in UTC.
fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc.from_utc_datetime(&date.and_time(NaiveTime::default()));
    let end = start
        .checked_add_days(Days::new(1))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    (start, end)
}

/// Whether `ticket` belongs in the snapshot for the day `[start, end)`.
///
/// That is: created that day, finalized that day, or created by the end of
/// the day and still not finalized when it began.
fn in_window(ticket: &Ticket, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    ticket.created_at < end && finalized_at(ticket).is_none_or(|at| at >= start)
}

/// Derives the snapshot for `date` from a tenant's tickets, their
/// escalation records and staff.
///
/// Every figure reflects the tickets as they stood at the end of `date`,
/// so recomputing a past day gives the same answer however the tickets
/// moved on since. Pure: the same inputs always produce the same snapshot.
pub fn build_snapshot(
    tenant_id: &str,
    date: NaiveDate,
    tickets: &[Ticket],
    escalations: &[EscalationRecord],
    staff: &[StaffMember],
) -> AnalyticsSnapshot {
    let (start, end) = day_bounds(date);
    let window: Vec<&Ticket> = tickets
        .iter()
        .filter(|t| t.tenant_id == tenant_id && in_window(t, start, end))
        .collect();
    let escalated: HashSet<&str> = escalations
        .iter()
        .filter(|e| e.created_at < end)
        .map(|e| e.ticket_id.as_str())
        .collect();

    let mut snap = AnalyticsSnapshot::empty(tenant_id, date);
    snap.total_tickets = window.len() as u32;
    for t in &window {
        match status_at(t, end) {
            TicketStatus::Open | TicketStatus::Pending | TicketStatus::InProgress => {
                snap.open_tickets += 1
            }
            TicketStatus::Resolved => snap.resolved_tickets += 1,
            TicketStatus::Closed => snap.closed_tickets += 1,
            TicketStatus::Cancelled => snap.cancelled_tickets += 1,
        }
        if escalated.contains(t.id.as_str()) {
            snap.escalated_tickets += 1;
        }
    }

    snap.avg_response_time = mean(
        window
            .iter()
            .filter(|t| t.first_response_time.is_some_and(|r| r < end))
            .filter_map(|t| t.response_time_hours()),
    );
    snap.avg_resolution_time = mean(window.iter().filter_map(|t| resolution_hours_at(t, end)));
    // Ratings land on closed tickets and are their last write.
    snap.satisfaction_avg = mean(
        window
            .iter()
            .filter(|t| status_at(t, end) == TicketStatus::Closed && t.updated_at < end)
            .filter_map(|t| t.satisfaction_rating.map(f64::from)),
    );
    snap.escalation_rate = if snap.total_tickets == 0 {
        0.0
    } else {
        f64::from(snap.escalated_tickets) / f64::from(snap.total_tickets)
    };
    snap.active_staff_count = staff
        .iter()
        .filter(|s| s.tenant_id == tenant_id && s.is_available)
        .count() as u32;
    snap
}

impl Engine {
    /// Computes and stores the snapshot for one day, replacing any earlier
    /// computation for the same day.
    pub fn compute_snapshot(&self, tenant_id: &str, date: NaiveDate) -> Result<AnalyticsSnapshot> {
        let tickets = self.store.list_tickets(&TicketFilter::for_tenant(tenant_id))?;
        let mut escalations = Vec::new();
        for t in tickets.iter().filter(|t| t.is_escalated) {
            escalations.extend(self.store.get_escalations(&t.id)?);
        }
        let staff = self.store.list_staff(tenant_id)?;
        let snap = build_snapshot(tenant_id, date, &tickets, &escalations, &staff);
        self.store.upsert_snapshot(&snap)?;
        info!(tenant_id, %date, total = snap.total_tickets, "analytics snapshot stored");
        Ok(snap)
    }

    /// Computes every day in `from..=to`. An inverted range computes nothing.
    pub fn compute_range(
        &self,
        tenant_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AnalyticsSnapshot>> {
        let mut out = Vec::new();
        let mut day = from;
        while day <= to {
            out.push(self.compute_snapshot(tenant_id, day)?);
            match day.checked_add_days(Days::new(1)) {
                Some(next) => day = next,
                None => break,
            }
        }
        Ok(out)
    }

    pub fn get_snapshot(&self, tenant_id: &str, date: NaiveDate) -> Result<AnalyticsSnapshot> {
        Ok(self.store.get_snapshot(tenant_id, date)?)
    }

    /// Stored snapshots with `from <= date <= to`, ordered by date.
    pub fn get_snapshots(
        &self,
        tenant_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AnalyticsSnapshot>> {
        Ok(self.store.get_snapshots(tenant_id, from, to)?)
    }
}
