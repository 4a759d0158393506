//! Storage and Transaction traits.

use chrono::{DateTime, NaiveDate, Utc};

use desk_core::analytics::AnalyticsSnapshot;
use desk_core::enums::{BreachKind, Category, EventType, Priority};
use desk_core::filter::TicketFilter;
use desk_core::message::{EscalationRecord, Event, Message, NewMessage};
use desk_core::sla::SlaPolicy;
use desk_core::staff::StaffMember;
use desk_core::ticket::Ticket;

use crate::error::Result;

/// Persistent state of the support desk.
///
/// Implementations must be `Send + Sync`; the engine shares one store across
/// request threads and the background scheduler.
pub trait Storage: Send + Sync {
    // -- Tickets -------------------------------------------------------------

    /// Inserts a new ticket and records a `created` event.
    fn create_ticket(&self, ticket: &Ticket, actor: &str) -> Result<()>;

    fn get_ticket(&self, id: &str) -> Result<Ticket>;

    /// Tickets matching `filter`, oldest first.
    fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>>;

    // -- Messages and audit trail -------------------------------------------

    /// Messages of a ticket in append order.
    fn get_messages(&self, ticket_id: &str) -> Result<Vec<Message>>;

    /// Audit events of a ticket, newest first, at most `limit` (0 = all).
    fn get_events(&self, ticket_id: &str, limit: u32) -> Result<Vec<Event>>;

    fn get_escalations(&self, ticket_id: &str) -> Result<Vec<EscalationRecord>>;

    // -- Staff and capacity ----------------------------------------------------

    /// Inserts or updates a staff record. The live `current_ticket_count` and
    /// the performance counters of an existing row are preserved.
    fn upsert_staff(&self, staff: &StaffMember) -> Result<()>;

    fn get_staff(&self, id: &str) -> Result<StaffMember>;

    /// All staff of a tenant ordered by id.
    fn list_staff(&self, tenant_id: &str) -> Result<Vec<StaffMember>>;

    /// Takes one unit of capacity. Returns `false` when the staff member is
    /// already at `max_concurrent_tickets` (or does not exist).
    fn reserve(&self, staff_id: &str) -> Result<bool>;

    /// Returns one unit of capacity, floored at zero.
    fn release(&self, staff_id: &str) -> Result<()>;

    /// Number of non-terminal tickets assigned to `staff_id`.
    fn count_active_assignments(&self, staff_id: &str) -> Result<u32>;

    /// Overwrites the live counter. Only the reconciliation job uses this.
    fn set_ticket_count(&self, staff_id: &str, count: u32) -> Result<()>;

    // -- SLA policies --------------------------------------------------------

    /// Inserts or replaces the policy for its (tenant, priority, category)
    /// and returns it with the stored id.
    fn upsert_policy(&self, policy: &SlaPolicy) -> Result<SlaPolicy>;

    /// The active policy for exactly this key, if any. `None` category
    /// selects the wildcard row.
    fn find_policy(
        &self,
        tenant_id: &str,
        priority: Priority,
        category: Option<Category>,
    ) -> Result<Option<SlaPolicy>>;

    fn list_policies(&self, tenant_id: &str) -> Result<Vec<SlaPolicy>>;

    // -- Analytics snapshots ---------------------------------------------------

    /// Writes the snapshot, replacing any prior row for (tenant, date).
    fn upsert_snapshot(&self, snapshot: &AnalyticsSnapshot) -> Result<()>;

    fn get_snapshot(&self, tenant_id: &str, date: NaiveDate) -> Result<AnalyticsSnapshot>;

    /// Snapshots with `from <= date <= to`, ordered by date.
    fn get_snapshots(
        &self,
        tenant_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AnalyticsSnapshot>>;

    // -- Transactions --------------------------------------------------------

    /// Runs `f` inside a database transaction. The transaction commits when
    /// `f` returns `Ok` and rolls back otherwise.
    fn run_in_transaction(&self, f: &dyn Fn(&dyn Transaction) -> Result<()>) -> Result<()>;
}

/// Operations available inside [`Storage::run_in_transaction`].
///
/// Every lifecycle mutation is a handful of these calls; nothing is visible
/// to other connections until the closure returns `Ok`.
pub trait Transaction {
    // -- Tickets -------------------------------------------------------------

    fn get_ticket(&self, id: &str) -> Result<Ticket>;

    /// Inserts a ticket. Fails with `AlreadyExists` on an id collision.
    fn insert_ticket(&self, ticket: &Ticket) -> Result<()>;

    /// Writes every mutable column of `ticket` if the stored version still
    /// equals `expected_version`. The stored version becomes `ticket.version`.
    fn update_ticket(&self, ticket: &Ticket, expected_version: i64) -> Result<()>;

    /// Sets `first_response_time` unless it is already set. Returns whether
    /// this call set it.
    fn set_first_response_if_null(&self, ticket_id: &str, at: DateTime<Utc>) -> Result<bool>;

    // -- Messages and audit trail -------------------------------------------

    fn add_message(
        &self,
        ticket_id: &str,
        message: &NewMessage,
        at: DateTime<Utc>,
    ) -> Result<Message>;

    #[allow(clippy::too_many_arguments)]
    fn emit_event(
        &self,
        ticket: &Ticket,
        event_type: EventType,
        actor: &str,
        old_value: Option<&str>,
        new_value: Option<&str>,
        comment: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<()>;

    fn add_escalation(
        &self,
        ticket_id: &str,
        from_level: u32,
        to_level: u32,
        reason: &str,
        kind: BreachKind,
        at: DateTime<Utc>,
    ) -> Result<()>;

    /// Whether the ticket already has an escalation record of `kind`.
    fn has_escalation(&self, ticket_id: &str, kind: BreachKind) -> Result<bool>;

    // -- Staff and capacity ----------------------------------------------------

    fn get_staff(&self, id: &str) -> Result<StaffMember>;

    fn reserve(&self, staff_id: &str) -> Result<bool>;

    fn release(&self, staff_id: &str) -> Result<()>;

    /// Counts one more closed ticket and folds `hours` into the running mean.
    fn record_resolution(&self, staff_id: &str, hours: f64) -> Result<()>;

    /// Recomputes `satisfaction_avg` from the staff member's rated tickets.
    fn refresh_satisfaction(&self, staff_id: &str) -> Result<()>;
}
