//! Escalation monitor.
//!
//! A sweep walks every non-terminal ticket once and applies two SLA checks
//! plus an unassigned-ticket retry. Every action is guarded by state the
//! sweep itself writes (the level, the breach record, the assignee), so
//! running the sweep twice in a row does nothing the second time.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use desk_core::enums::{BreachKind, TicketStatus};
use desk_core::filter::TicketFilter;
use desk_core::sla::SlaPolicy;
use desk_core::ticket::Ticket;

use crate::engine::{Engine, SYSTEM_ACTOR};
use crate::error::Result;
use crate::resolver::PolicyCache;

pub const FIRST_RESPONSE_REASON: &str = "first-response SLA breach";
pub const RESOLUTION_REASON: &str = "resolution SLA breach";

/// What one sweep did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub examined: usize,
    pub escalated: usize,
    pub rerouted: usize,
    /// Previously unassigned tickets that found a staff member.
    pub assigned: usize,
    pub errors: usize,
}

/// The level a first-response breach raises the ticket to, if breached.
pub fn first_response_breach(ticket: &Ticket, policy: &SlaPolicy, now: DateTime<Utc>) -> Option<u32> {
    let breached = !ticket.is_terminal()
        && ticket.first_response_time.is_none()
        && ticket.age(now) > policy.first_response_target
        && ticket.escalation_level < policy.escalation_level;
    breached.then_some(policy.escalation_level)
}

/// The level a resolution breach raises the ticket to, if breached.
///
/// The clock starts at the first response. Whether the breach was already
/// escalated is checked separately against the escalation records.
pub fn resolution_breach(ticket: &Ticket, policy: &SlaPolicy, now: DateTime<Utc>) -> Option<u32> {
    let responded = ticket.first_response_time?;
    let working = matches!(ticket.status, TicketStatus::Pending | TicketStatus::InProgress);
    let breached = working
        && ticket.actual_resolution_time.is_none()
        && now - responded > policy.resolution_target;
    breached.then(|| policy.escalation_level.max(ticket.escalation_level + 1))
}

impl Engine {
    /// Runs one escalation pass over all tenants.
    pub fn sweep(&self) -> Result<SweepReport> {
        self.sweep_at(Utc::now())
    }

    /// [`sweep`](Self::sweep) as of `now`.
    ///
    /// Only listing the tickets can fail the sweep; a failure on one ticket
    /// is logged, counted and skipped.
    pub fn sweep_at(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let filter = TicketFilter {
            non_terminal: true,
            ..TicketFilter::default()
        };
        let tickets = self.store.list_tickets(&filter)?;

        let mut cache = PolicyCache::new(self.store());
        let mut report = SweepReport::default();
        for ticket in &tickets {
            report.examined += 1;
            if let Err(e) = self.evaluate(ticket, &mut cache, now, &mut report) {
                warn!(id = %ticket.id, error = %e, "sweep failed for ticket");
                report.errors += 1;
            }
        }

        info!(
            examined = report.examined,
            escalated = report.escalated,
            rerouted = report.rerouted,
            assigned = report.assigned,
            errors = report.errors,
            "escalation sweep finished"
        );
        Ok(report)
    }

    fn evaluate(
        &self,
        ticket: &Ticket,
        cache: &mut PolicyCache<'_>,
        now: DateTime<Utc>,
        report: &mut SweepReport,
    ) -> Result<()> {
        if let Some(policy) = cache.lookup(&ticket.tenant_id, ticket.priority, ticket.category)? {
            let breach = if let Some(level) = first_response_breach(ticket, &policy, now) {
                Some((level, BreachKind::FirstResponse, FIRST_RESPONSE_REASON))
            } else if let Some(level) = resolution_breach(ticket, &policy, now) {
                let already = self
                    .store
                    .get_escalations(&ticket.id)?
                    .iter()
                    .any(|r| r.kind == BreachKind::Resolution);
                (!already).then_some((level, BreachKind::Resolution, RESOLUTION_REASON))
            } else {
                None
            };

            if let Some((level, kind, reason)) = breach {
                match self.escalate_at(&ticket.id, reason, level, kind, SYSTEM_ACTOR, now) {
                    Ok(outcome) => {
                        report.escalated += 1;
                        if outcome.rerouted_to.is_some() {
                            report.rerouted += 1;
                        }
                    }
                    // Someone else moved the ticket since it was listed.
                    Err(e) if e.is_invalid_state() => {
                        debug!(id = %ticket.id, error = %e, "breach already handled");
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        if ticket.status == TicketStatus::Open
            && ticket.assigned_to.is_none()
            && self.route_with(&ticket.id, cache, now)?.is_some()
        {
            report.assigned += 1;
        }
        Ok(())
    }
}
