//! Messages, audit events and escalation records for [`SqliteStore`].

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params};

use desk_core::enums::{BreachKind, EventType};
use desk_core::message::{EscalationRecord, Event, Message, NewMessage};
use desk_core::ticket::Ticket;

use crate::error::Result;
use crate::sqlite::store::SqliteStore;
use crate::sqlite::tickets::{format_datetime, parse_datetime, parse_enum};

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

fn scan_message(row: &Row<'_>) -> rusqlite::Result<Message> {
    let message_type: String = row.get(5)?;
    let created_at: String = row.get(6)?;
    Ok(Message {
        id: row.get(0)?,
        ticket_id: row.get(1)?,
        sender: row.get(2)?,
        body: row.get(3)?,
        is_internal: row.get(4)?,
        message_type: parse_enum(5, &message_type)?,
        created_at: parse_datetime(6, &created_at)?,
    })
}

pub(crate) fn add_message_on_conn(
    conn: &Connection,
    ticket_id: &str,
    message: &NewMessage,
    at: &DateTime<Utc>,
) -> Result<Message> {
    conn.execute(
        "INSERT INTO messages (ticket_id, sender, body, is_internal, message_type, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            ticket_id,
            message.sender,
            message.body,
            message.is_internal,
            message.message_type.as_str(),
            format_datetime(at),
        ],
    )?;
    Ok(Message {
        id: conn.last_insert_rowid(),
        ticket_id: ticket_id.to_string(),
        sender: message.sender.clone(),
        body: message.body.clone(),
        is_internal: message.is_internal,
        message_type: message.message_type,
        created_at: *at,
    })
}

pub(crate) fn get_messages_on_conn(conn: &Connection, ticket_id: &str) -> Result<Vec<Message>> {
    let mut stmt = conn.prepare(
        "SELECT id, ticket_id, sender, body, is_internal, message_type, created_at
         FROM messages WHERE ticket_id = ?1 ORDER BY id ASC",
    )?;
    let messages = stmt
        .query_map(params![ticket_id], scan_message)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(messages)
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Emits an event row into the events table.
#[allow(clippy::too_many_arguments)]
pub(crate) fn emit_event_on_conn(
    conn: &Connection,
    ticket: &Ticket,
    event_type: EventType,
    actor: &str,
    old_value: Option<&str>,
    new_value: Option<&str>,
    comment: Option<&str>,
    at: &DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO events (ticket_id, tenant_id, event_type, actor, old_value, new_value, comment, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            ticket.id,
            ticket.tenant_id,
            event_type.as_str(),
            actor,
            old_value,
            new_value,
            comment,
            format_datetime(at),
        ],
    )?;
    Ok(())
}

fn scan_event(row: &Row<'_>) -> rusqlite::Result<Event> {
    let event_type: String = row.get(3)?;
    let created_at: String = row.get(8)?;
    Ok(Event {
        id: row.get(0)?,
        ticket_id: row.get(1)?,
        tenant_id: row.get(2)?,
        event_type: parse_enum(3, &event_type)?,
        actor: row.get(4)?,
        old_value: row.get(5)?,
        new_value: row.get(6)?,
        comment: row.get(7)?,
        created_at: parse_datetime(8, &created_at)?,
    })
}

pub(crate) fn get_events_on_conn(conn: &Connection, ticket_id: &str, limit: u32) -> Result<Vec<Event>> {
    // SQLite treats a negative LIMIT as "no limit".
    let limit: i64 = if limit == 0 { -1 } else { i64::from(limit) };
    let mut stmt = conn.prepare(
        "SELECT id, ticket_id, tenant_id, event_type, actor, old_value, new_value, comment, created_at
         FROM events WHERE ticket_id = ?1 ORDER BY id DESC LIMIT ?2",
    )?;
    let events = stmt
        .query_map(params![ticket_id, limit], scan_event)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(events)
}

// ---------------------------------------------------------------------------
// Escalations
// ---------------------------------------------------------------------------

pub(crate) fn add_escalation_on_conn(
    conn: &Connection,
    ticket_id: &str,
    from_level: u32,
    to_level: u32,
    reason: &str,
    kind: BreachKind,
    at: &DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO escalations (ticket_id, from_level, to_level, reason, kind, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            ticket_id,
            from_level,
            to_level,
            reason,
            kind.as_str(),
            format_datetime(at)
        ],
    )?;
    Ok(())
}

pub(crate) fn has_escalation_on_conn(
    conn: &Connection,
    ticket_id: &str,
    kind: BreachKind,
) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM escalations WHERE ticket_id = ?1 AND kind = ?2",
        params![ticket_id, kind.as_str()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn scan_escalation(row: &Row<'_>) -> rusqlite::Result<EscalationRecord> {
    let kind: String = row.get(5)?;
    let created_at: String = row.get(6)?;
    Ok(EscalationRecord {
        id: row.get(0)?,
        ticket_id: row.get(1)?,
        from_level: row.get(2)?,
        to_level: row.get(3)?,
        reason: row.get(4)?,
        kind: parse_enum(5, &kind)?,
        created_at: parse_datetime(6, &created_at)?,
    })
}

pub(crate) fn get_escalations_on_conn(
    conn: &Connection,
    ticket_id: &str,
) -> Result<Vec<EscalationRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, ticket_id, from_level, to_level, reason, kind, created_at
         FROM escalations WHERE ticket_id = ?1 ORDER BY id ASC",
    )?;
    let records = stmt
        .query_map(params![ticket_id], scan_escalation)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(records)
}

// ---------------------------------------------------------------------------
// SqliteStore methods
// ---------------------------------------------------------------------------

impl SqliteStore {
    pub fn get_messages_impl(&self, ticket_id: &str) -> Result<Vec<Message>> {
        let conn = self.lock_conn()?;
        get_messages_on_conn(&conn, ticket_id)
    }

    pub fn get_events_impl(&self, ticket_id: &str, limit: u32) -> Result<Vec<Event>> {
        let conn = self.lock_conn()?;
        get_events_on_conn(&conn, ticket_id, limit)
    }

    pub fn get_escalations_impl(&self, ticket_id: &str) -> Result<Vec<EscalationRecord>> {
        let conn = self.lock_conn()?;
        get_escalations_on_conn(&conn, ticket_id)
    }
}
