//! Ticket persistence for [`SqliteStore`].

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};

use desk_core::enums::{EventType, ParseEnumError, TicketStatus};
use desk_core::filter::TicketFilter;
use desk_core::ticket::Ticket;

use crate::error::{Result, StorageError};
use crate::sqlite::events;
use crate::sqlite::store::SqliteStore;

// ---------------------------------------------------------------------------
// Column list (shared between INSERT and SELECT)
// ---------------------------------------------------------------------------

/// All ticket columns in a deterministic order for SELECT queries.
pub(crate) const TICKET_COLUMNS: &str = r#"
    id, tenant_id, title, description, status, priority, category, tags,
    created_by, assigned_to, reporter_name, reporter_email, reporter_phone,
    created_at, updated_at, first_response_time, first_response_due_at,
    estimated_resolution_time, resolved_at, actual_resolution_time,
    escalation_level, is_escalated, escalation_reason,
    satisfaction_rating, satisfaction_feedback,
    resolution_notes, internal_notes, cancel_reason, version
"#;

// ---------------------------------------------------------------------------
// Value codecs
// ---------------------------------------------------------------------------

/// Formats a `DateTime<Utc>` as ISO 8601 TEXT for SQLite.
pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Parses an ISO 8601 TEXT column into a `DateTime<Utc>`.
pub(crate) fn parse_datetime(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    s.parse::<DateTime<Utc>>()
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.fZ").map(|n| n.and_utc())
        })
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn parse_opt_datetime(
    idx: usize,
    s: Option<String>,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    s.as_deref().map(|s| parse_datetime(idx, s)).transpose()
}

pub(crate) fn format_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(crate) fn parse_date(idx: usize, s: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Parses a closed-enum TEXT column.
pub(crate) fn parse_enum<T>(idx: usize, s: &str) -> rusqlite::Result<T>
where
    T: FromStr<Err = ParseEnumError>,
{
    s.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Parses a JSON string-list TEXT column.
pub(crate) fn parse_string_list(idx: usize, s: &str) -> rusqlite::Result<Vec<String>> {
    serde_json::from_str(s)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

// ---------------------------------------------------------------------------
// Row scanning
// ---------------------------------------------------------------------------

/// Deserialises a row into a [`Ticket`].
///
/// The column order MUST match [`TICKET_COLUMNS`].
pub(crate) fn scan_ticket(row: &Row<'_>) -> rusqlite::Result<Ticket> {
    let status: String = row.get(4)?;
    let priority: String = row.get(5)?;
    let category: String = row.get(6)?;
    let tags: String = row.get(7)?;
    let created_at: String = row.get(13)?;
    let updated_at: String = row.get(14)?;
    let rating: Option<i64> = row.get(23)?;

    Ok(Ticket {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        status: parse_enum(4, &status)?,
        priority: parse_enum(5, &priority)?,
        category: parse_enum(6, &category)?,
        tags: parse_string_list(7, &tags)?,
        created_by: row.get(8)?,
        assigned_to: row.get(9)?,
        reporter_name: row.get(10)?,
        reporter_email: row.get(11)?,
        reporter_phone: row.get(12)?,
        created_at: parse_datetime(13, &created_at)?,
        updated_at: parse_datetime(14, &updated_at)?,
        first_response_time: parse_opt_datetime(15, row.get(15)?)?,
        first_response_due_at: parse_opt_datetime(16, row.get(16)?)?,
        estimated_resolution_time: parse_opt_datetime(17, row.get(17)?)?,
        resolved_at: parse_opt_datetime(18, row.get(18)?)?,
        actual_resolution_time: parse_opt_datetime(19, row.get(19)?)?,
        escalation_level: row.get(20)?,
        is_escalated: row.get(21)?,
        escalation_reason: row.get(22)?,
        satisfaction_rating: rating.map(|r| r.clamp(0, 255) as u8),
        satisfaction_feedback: row.get(24)?,
        resolution_notes: row.get(25)?,
        internal_notes: row.get(26)?,
        cancel_reason: row.get(27)?,
        version: row.get(28)?,
    })
}

// ---------------------------------------------------------------------------
// Connection-level helpers (shared between store and transaction)
// ---------------------------------------------------------------------------

/// Inserts a ticket. An existing id yields `AlreadyExists`.
pub(crate) fn insert_ticket_on_conn(conn: &Connection, ticket: &Ticket) -> Result<()> {
    let exists: Option<i32> = conn
        .query_row("SELECT 1 FROM tickets WHERE id = ?1", params![ticket.id], |row| {
            row.get(0)
        })
        .optional()?;
    if exists.is_some() {
        return Err(StorageError::already_exists("ticket", &ticket.id));
    }

    let tags = serde_json::to_string(&ticket.tags)?;
    conn.execute(
        &format!(
            "INSERT INTO tickets ({TICKET_COLUMNS}) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20,
                ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29
            )"
        ),
        params![
            ticket.id,
            ticket.tenant_id,
            ticket.title,
            ticket.description,
            ticket.status.as_str(),
            ticket.priority.as_str(),
            ticket.category.as_str(),
            tags,
            ticket.created_by,
            ticket.assigned_to,
            ticket.reporter_name,
            ticket.reporter_email,
            ticket.reporter_phone,
            format_datetime(&ticket.created_at),
            format_datetime(&ticket.updated_at),
            ticket.first_response_time.as_ref().map(format_datetime),
            ticket.first_response_due_at.as_ref().map(format_datetime),
            ticket.estimated_resolution_time.as_ref().map(format_datetime),
            ticket.resolved_at.as_ref().map(format_datetime),
            ticket.actual_resolution_time.as_ref().map(format_datetime),
            ticket.escalation_level,
            ticket.is_escalated,
            ticket.escalation_reason,
            ticket.satisfaction_rating,
            ticket.satisfaction_feedback,
            ticket.resolution_notes,
            ticket.internal_notes,
            ticket.cancel_reason,
            ticket.version,
        ],
    )?;
    Ok(())
}

pub(crate) fn get_ticket_on_conn(conn: &Connection, id: &str) -> Result<Ticket> {
    conn.query_row(
        &format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = ?1"),
        params![id],
        scan_ticket,
    )
    .optional()?
    .ok_or_else(|| StorageError::not_found("ticket", id))
}

/// Writes all mutable columns guarded by the version check.
pub(crate) fn update_ticket_on_conn(
    conn: &Connection,
    ticket: &Ticket,
    expected_version: i64,
) -> Result<()> {
    let tags = serde_json::to_string(&ticket.tags)?;
    let changed = conn.execute(
        "UPDATE tickets SET
            title = ?2, description = ?3, status = ?4, priority = ?5, category = ?6,
            tags = ?7, assigned_to = ?8, updated_at = ?9,
            first_response_time = ?10, first_response_due_at = ?11,
            estimated_resolution_time = ?12, resolved_at = ?13, actual_resolution_time = ?14,
            escalation_level = ?15, is_escalated = ?16, escalation_reason = ?17,
            satisfaction_rating = ?18, satisfaction_feedback = ?19,
            resolution_notes = ?20, internal_notes = ?21, cancel_reason = ?22,
            version = ?23
         WHERE id = ?1 AND version = ?24",
        params![
            ticket.id,
            ticket.title,
            ticket.description,
            ticket.status.as_str(),
            ticket.priority.as_str(),
            ticket.category.as_str(),
            tags,
            ticket.assigned_to,
            format_datetime(&ticket.updated_at),
            ticket.first_response_time.as_ref().map(format_datetime),
            ticket.first_response_due_at.as_ref().map(format_datetime),
            ticket.estimated_resolution_time.as_ref().map(format_datetime),
            ticket.resolved_at.as_ref().map(format_datetime),
            ticket.actual_resolution_time.as_ref().map(format_datetime),
            ticket.escalation_level,
            ticket.is_escalated,
            ticket.escalation_reason,
            ticket.satisfaction_rating,
            ticket.satisfaction_feedback,
            ticket.resolution_notes,
            ticket.internal_notes,
            ticket.cancel_reason,
            ticket.version,
            expected_version,
        ],
    )?;

    if changed == 0 {
        // Distinguish a missing row from a lost race.
        get_ticket_on_conn(conn, &ticket.id)?;
        return Err(StorageError::Conflict {
            entity: "ticket".into(),
            id: ticket.id.clone(),
            expected: expected_version,
        });
    }
    Ok(())
}

pub(crate) fn set_first_response_if_null_on_conn(
    conn: &Connection,
    ticket_id: &str,
    at: &DateTime<Utc>,
) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE tickets SET first_response_time = ?2, version = version + 1
         WHERE id = ?1 AND first_response_time IS NULL",
        params![ticket_id, format_datetime(at)],
    )?;
    Ok(changed == 1)
}

/// Lists tickets matching the filter, oldest first.
pub(crate) fn list_tickets_on_conn(conn: &Connection, filter: &TicketFilter) -> Result<Vec<Ticket>> {
    let mut where_clauses: Vec<String> = Vec::new();
    let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
    let mut param_idx = 1;

    if let Some(ref tenant) = filter.tenant_id {
        where_clauses.push(format!("tenant_id = ?{param_idx}"));
        param_values.push(Box::new(tenant.clone()));
        param_idx += 1;
    }
    if let Some(status) = filter.status {
        where_clauses.push(format!("status = ?{param_idx}"));
        param_values.push(Box::new(status.as_str()));
        param_idx += 1;
    }
    if let Some(priority) = filter.priority {
        where_clauses.push(format!("priority = ?{param_idx}"));
        param_values.push(Box::new(priority.as_str()));
        param_idx += 1;
    }
    if let Some(category) = filter.category {
        where_clauses.push(format!("category = ?{param_idx}"));
        param_values.push(Box::new(category.as_str()));
        param_idx += 1;
    }
    if let Some(ref assignee) = filter.assigned_to {
        where_clauses.push(format!("assigned_to = ?{param_idx}"));
        param_values.push(Box::new(assignee.clone()));
        param_idx += 1;
    }
    if let Some(ref creator) = filter.created_by {
        where_clauses.push(format!("created_by = ?{param_idx}"));
        param_values.push(Box::new(creator.clone()));
        param_idx += 1;
    }
    if let Some(ref query) = filter.search {
        where_clauses.push(format!(
            "(title LIKE ?{pi} OR description LIKE ?{pi})",
            pi = param_idx
        ));
        param_values.push(Box::new(format!("%{query}%")));
        param_idx += 1;
    }
    if filter.unassigned {
        where_clauses.push("assigned_to IS NULL".to_string());
    }
    if filter.non_terminal {
        where_clauses.push(format!(
            "status NOT IN ('{}', '{}')",
            TicketStatus::Closed.as_str(),
            TicketStatus::Cancelled.as_str()
        ));
    }

    let mut sql = format!("SELECT {TICKET_COLUMNS} FROM tickets");
    if !where_clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&where_clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY created_at ASC, id ASC");
    if let Some(limit) = filter.limit {
        sql.push_str(&format!(" LIMIT ?{param_idx}"));
        param_values.push(Box::new(limit));
    }

    let params_ref: Vec<&dyn rusqlite::types::ToSql> =
        param_values.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let tickets = stmt
        .query_map(params_ref.as_slice(), scan_ticket)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tickets)
}

// ---------------------------------------------------------------------------
// SqliteStore ticket methods
// ---------------------------------------------------------------------------

impl SqliteStore {
    /// Creates a ticket and its `created` audit event in one transaction.
    pub fn create_ticket_impl(&self, ticket: &Ticket, actor: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StorageError::Transaction(format!("failed to begin: {e}")))?;
        insert_ticket_on_conn(&tx, ticket)?;
        events::emit_event_on_conn(
            &tx,
            ticket,
            EventType::Created,
            actor,
            None,
            Some(ticket.status.as_str()),
            None,
            &ticket.created_at,
        )?;
        tx.commit()
            .map_err(|e| StorageError::Transaction(format!("failed to commit: {e}")))?;
        Ok(())
    }

    pub fn get_ticket_impl(&self, id: &str) -> Result<Ticket> {
        let conn = self.lock_conn()?;
        get_ticket_on_conn(&conn, id)
    }

    pub fn list_tickets_impl(&self, filter: &TicketFilter) -> Result<Vec<Ticket>> {
        let conn = self.lock_conn()?;
        list_tickets_on_conn(&conn, filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use desk_core::enums::{Category, Priority};
    use desk_core::ticket::TicketDraft;
    use pretty_assertions::assert_eq;

    fn test_store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    fn ticket(id: &str, tenant: &str, title: &str) -> Ticket {
        TicketDraft::new(tenant, title, "alice")
            .priority(Priority::High)
            .category(Category::Technical)
            .tags(vec!["lis".into()])
            .into_ticket(id, Utc::now())
    }

    #[test]
    fn create_and_get_ticket() {
        let store = test_store();
        let t = ticket("tk-1", "t1", "Analyzer offline");
        store.create_ticket_impl(&t, "alice").unwrap();

        let got = store.get_ticket_impl("tk-1").unwrap();
        assert_eq!(got.title, "Analyzer offline");
        assert_eq!(got.priority, Priority::High);
        assert_eq!(got.tags, vec!["lis".to_string()]);
        assert_eq!(got.status, TicketStatus::Open);
        // Millisecond precision survives the round trip.
        assert_eq!(format_datetime(&got.created_at), format_datetime(&t.created_at));
    }

    #[test]
    fn duplicate_id_is_already_exists() {
        let store = test_store();
        let t = ticket("tk-1", "t1", "First");
        store.create_ticket_impl(&t, "alice").unwrap();
        let err = store.create_ticket_impl(&t, "alice").unwrap_err();
        assert!(err.is_already_exists());
    }

    #[test]
    fn get_nonexistent_ticket_returns_not_found() {
        let store = test_store();
        let err = store.get_ticket_impl("tk-nope").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn update_checks_version() {
        let store = test_store();
        let t = ticket("tk-1", "t1", "First");
        store.create_ticket_impl(&t, "alice").unwrap();

        let conn = store.lock_conn().unwrap();
        let mut updated = t.clone();
        updated.status = TicketStatus::Pending;
        updated.version = 1;
        update_ticket_on_conn(&conn, &updated, 0).unwrap();

        // A second writer still holding version 0 loses.
        let mut stale = t.clone();
        stale.status = TicketStatus::Cancelled;
        stale.version = 1;
        let err = update_ticket_on_conn(&conn, &stale, 0).unwrap_err();
        assert!(err.is_conflict());

        let got = get_ticket_on_conn(&conn, "tk-1").unwrap();
        assert_eq!(got.status, TicketStatus::Pending);
        assert_eq!(got.version, 1);
    }

    #[test]
    fn update_missing_ticket_is_not_found() {
        let store = test_store();
        let conn = store.lock_conn().unwrap();
        let t = ticket("tk-ghost", "t1", "Ghost");
        let err = update_ticket_on_conn(&conn, &t, 0).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn first_response_set_only_once() {
        let store = test_store();
        store
            .create_ticket_impl(&ticket("tk-1", "t1", "First"), "alice")
            .unwrap();
        let conn = store.lock_conn().unwrap();
        let first = Utc::now();
        assert!(set_first_response_if_null_on_conn(&conn, "tk-1", &first).unwrap());
        assert!(!set_first_response_if_null_on_conn(&conn, "tk-1", &Utc::now()).unwrap());

        let got = get_ticket_on_conn(&conn, "tk-1").unwrap();
        assert_eq!(
            got.first_response_time.map(|t| format_datetime(&t)),
            Some(format_datetime(&first))
        );
    }

    #[test]
    fn list_filters() {
        let store = test_store();
        store
            .create_ticket_impl(&ticket("tk-1", "t1", "Analyzer offline"), "alice")
            .unwrap();
        store
            .create_ticket_impl(&ticket("tk-2", "t1", "Invoice wrong"), "bob")
            .unwrap();
        store
            .create_ticket_impl(&ticket("tk-3", "t2", "Analyzer noisy"), "alice")
            .unwrap();

        let t1 = store
            .list_tickets_impl(&TicketFilter::for_tenant("t1"))
            .unwrap();
        assert_eq!(t1.len(), 2);

        let search = TicketFilter {
            search: Some("analyzer".into()),
            ..TicketFilter::default()
        };
        let found = store.list_tickets_impl(&search).unwrap();
        let ids: Vec<&str> = found.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["tk-1", "tk-3"]);

        let by_creator = TicketFilter {
            created_by: Some("bob".into()),
            unassigned: true,
            limit: Some(5),
            ..TicketFilter::default()
        };
        let found = store.list_tickets_impl(&by_creator).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "tk-2");
    }
}
