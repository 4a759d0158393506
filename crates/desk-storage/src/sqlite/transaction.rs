//! Transaction wrapper for [`SqliteStore`].

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use desk_core::enums::{BreachKind, EventType};
use desk_core::message::{Message, NewMessage};
use desk_core::staff::StaffMember;
use desk_core::ticket::Ticket;

use crate::error::{Result, StorageError};
use crate::sqlite::events;
use crate::sqlite::staff;
use crate::sqlite::store::SqliteStore;
use crate::sqlite::tickets;
use crate::traits::Transaction;

/// A thin wrapper around a SQLite connection that is inside a transaction.
///
/// Implements [`Transaction`] by delegating to the same connection-level
/// helpers used by [`SqliteStore`].
pub(crate) struct SqliteTx<'a> {
    pub(crate) conn: &'a Connection,
}

impl Transaction for SqliteTx<'_> {
    fn get_ticket(&self, id: &str) -> Result<Ticket> {
        tickets::get_ticket_on_conn(self.conn, id)
    }

    fn insert_ticket(&self, ticket: &Ticket) -> Result<()> {
        tickets::insert_ticket_on_conn(self.conn, ticket)
    }

    fn update_ticket(&self, ticket: &Ticket, expected_version: i64) -> Result<()> {
        tickets::update_ticket_on_conn(self.conn, ticket, expected_version)
    }

    fn set_first_response_if_null(&self, ticket_id: &str, at: DateTime<Utc>) -> Result<bool> {
        tickets::set_first_response_if_null_on_conn(self.conn, ticket_id, &at)
    }

    fn add_message(
        &self,
        ticket_id: &str,
        message: &NewMessage,
        at: DateTime<Utc>,
    ) -> Result<Message> {
        events::add_message_on_conn(self.conn, ticket_id, message, &at)
    }

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
    ) -> Result<()> {
        events::emit_event_on_conn(
            self.conn, ticket, event_type, actor, old_value, new_value, comment, &at,
        )
    }

    fn add_escalation(
        &self,
        ticket_id: &str,
        from_level: u32,
        to_level: u32,
        reason: &str,
        kind: BreachKind,
        at: DateTime<Utc>,
    ) -> Result<()> {
        events::add_escalation_on_conn(self.conn, ticket_id, from_level, to_level, reason, kind, &at)
    }

    fn has_escalation(&self, ticket_id: &str, kind: BreachKind) -> Result<bool> {
        events::has_escalation_on_conn(self.conn, ticket_id, kind)
    }

    fn get_staff(&self, id: &str) -> Result<StaffMember> {
        staff::get_staff_on_conn(self.conn, id)
    }

    fn reserve(&self, staff_id: &str) -> Result<bool> {
        staff::reserve_on_conn(self.conn, staff_id)
    }

    fn release(&self, staff_id: &str) -> Result<()> {
        staff::release_on_conn(self.conn, staff_id)
    }

    fn record_resolution(&self, staff_id: &str, hours: f64) -> Result<()> {
        staff::record_resolution_on_conn(self.conn, staff_id, hours)
    }

    fn refresh_satisfaction(&self, staff_id: &str) -> Result<()> {
        staff::refresh_satisfaction_on_conn(self.conn, staff_id)
    }
}

// ---------------------------------------------------------------------------
// SqliteStore::run_in_transaction
// ---------------------------------------------------------------------------

impl SqliteStore {
    /// Runs a closure inside a database transaction.
    pub fn run_in_transaction_impl(
        &self,
        f: &dyn Fn(&dyn Transaction) -> Result<()>,
    ) -> Result<()> {
        let conn = self.lock_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StorageError::Transaction(format!("failed to begin: {e}")))?;

        let sqlite_tx = SqliteTx { conn: &tx };
        match f(&sqlite_tx) {
            Ok(()) => {
                tx.commit()
                    .map_err(|e| StorageError::Transaction(format!("failed to commit: {e}")))?;
                Ok(())
            }
            Err(e) => {
                // Transaction is rolled back on drop.
                Err(e)
            }
        }
    }
}
