//! Storage backend for the support desk engine.
//!
//! Provides the [`Storage`] trait and a SQLite implementation ([`SqliteStore`]).

pub mod error;
pub mod sqlite;
pub mod traits;

// Re-exports for convenience.
pub use error::{Result, StorageError};
pub use sqlite::SqliteStore;
pub use traits::{Storage, Transaction};

// ---------------------------------------------------------------------------
// Storage trait implementation for SqliteStore
// ---------------------------------------------------------------------------

use chrono::NaiveDate;

use desk_core::analytics::AnalyticsSnapshot;
use desk_core::enums::{Category, Priority};
use desk_core::filter::TicketFilter;
use desk_core::message::{EscalationRecord, Event, Message};
use desk_core::sla::SlaPolicy;
use desk_core::staff::StaffMember;
use desk_core::ticket::Ticket;

impl Storage for SqliteStore {
    fn create_ticket(&self, ticket: &Ticket, actor: &str) -> Result<()> {
        self.create_ticket_impl(ticket, actor)
    }

    fn get_ticket(&self, id: &str) -> Result<Ticket> {
        self.get_ticket_impl(id)
    }

    fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>> {
        self.list_tickets_impl(filter)
    }

    fn get_messages(&self, ticket_id: &str) -> Result<Vec<Message>> {
        self.get_messages_impl(ticket_id)
    }

    fn get_events(&self, ticket_id: &str, limit: u32) -> Result<Vec<Event>> {
        self.get_events_impl(ticket_id, limit)
    }

    fn get_escalations(&self, ticket_id: &str) -> Result<Vec<EscalationRecord>> {
        self.get_escalations_impl(ticket_id)
    }

    fn upsert_staff(&self, staff: &StaffMember) -> Result<()> {
        self.upsert_staff_impl(staff)
    }

    fn get_staff(&self, id: &str) -> Result<StaffMember> {
        self.get_staff_impl(id)
    }

    fn list_staff(&self, tenant_id: &str) -> Result<Vec<StaffMember>> {
        self.list_staff_impl(tenant_id)
    }

    fn reserve(&self, staff_id: &str) -> Result<bool> {
        self.reserve_impl(staff_id)
    }

    fn release(&self, staff_id: &str) -> Result<()> {
        self.release_impl(staff_id)
    }

    fn count_active_assignments(&self, staff_id: &str) -> Result<u32> {
        self.count_active_assignments_impl(staff_id)
    }

    fn set_ticket_count(&self, staff_id: &str, count: u32) -> Result<()> {
        self.set_ticket_count_impl(staff_id, count)
    }

    fn upsert_policy(&self, policy: &SlaPolicy) -> Result<SlaPolicy> {
        self.upsert_policy_impl(policy)
    }

    fn find_policy(
        &self,
        tenant_id: &str,
        priority: Priority,
        category: Option<Category>,
    ) -> Result<Option<SlaPolicy>> {
        self.find_policy_impl(tenant_id, priority, category)
    }

    fn list_policies(&self, tenant_id: &str) -> Result<Vec<SlaPolicy>> {
        self.list_policies_impl(tenant_id)
    }

    fn upsert_snapshot(&self, snapshot: &AnalyticsSnapshot) -> Result<()> {
        self.upsert_snapshot_impl(snapshot)
    }

    fn get_snapshot(&self, tenant_id: &str, date: NaiveDate) -> Result<AnalyticsSnapshot> {
        self.get_snapshot_impl(tenant_id, date)
    }

    fn get_snapshots(
        &self,
        tenant_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AnalyticsSnapshot>> {
        self.get_snapshots_impl(tenant_id, from, to)
    }

    fn run_in_transaction(&self, f: &dyn Fn(&dyn Transaction) -> Result<()>) -> Result<()> {
        self.run_in_transaction_impl(f)
    }
}
