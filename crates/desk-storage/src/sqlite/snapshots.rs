//! Analytics snapshot table for [`SqliteStore`].

use chrono::NaiveDate;
use rusqlite::{OptionalExtension, Row, params};

use desk_core::analytics::AnalyticsSnapshot;

use crate::error::{Result, StorageError};
use crate::sqlite::store::SqliteStore;
use crate::sqlite::tickets::{format_date, parse_date};

const SNAPSHOT_COLUMNS: &str = r#"
    tenant_id, date, total_tickets, open_tickets, resolved_tickets, closed_tickets,
    cancelled_tickets, escalated_tickets, avg_response_time, avg_resolution_time,
    satisfaction_avg, escalation_rate, active_staff_count
"#;

fn scan_snapshot(row: &Row<'_>) -> rusqlite::Result<AnalyticsSnapshot> {
    let date: String = row.get(1)?;
    Ok(AnalyticsSnapshot {
        tenant_id: row.get(0)?,
        date: parse_date(1, &date)?,
        total_tickets: row.get(2)?,
        open_tickets: row.get(3)?,
        resolved_tickets: row.get(4)?,
        closed_tickets: row.get(5)?,
        cancelled_tickets: row.get(6)?,
        escalated_tickets: row.get(7)?,
        avg_response_time: row.get(8)?,
        avg_resolution_time: row.get(9)?,
        satisfaction_avg: row.get(10)?,
        escalation_rate: row.get(11)?,
        active_staff_count: row.get(12)?,
    })
}

impl SqliteStore {
    pub fn upsert_snapshot_impl(&self, snap: &AnalyticsSnapshot) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO analytics_snapshots ({SNAPSHOT_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
            ),
            params![
                snap.tenant_id,
                format_date(&snap.date),
                snap.total_tickets,
                snap.open_tickets,
                snap.resolved_tickets,
                snap.closed_tickets,
                snap.cancelled_tickets,
                snap.escalated_tickets,
                snap.avg_response_time,
                snap.avg_resolution_time,
                snap.satisfaction_avg,
                snap.escalation_rate,
                snap.active_staff_count,
            ],
        )?;
        Ok(())
    }

    pub fn get_snapshot_impl(&self, tenant_id: &str, date: NaiveDate) -> Result<AnalyticsSnapshot> {
        let conn = self.lock_conn()?;
        let date_str = format_date(&date);
        conn.query_row(
            &format!(
                "SELECT {SNAPSHOT_COLUMNS} FROM analytics_snapshots
                 WHERE tenant_id = ?1 AND date = ?2"
            ),
            params![tenant_id, date_str],
            scan_snapshot,
        )
        .optional()?
        .ok_or_else(|| StorageError::not_found("snapshot", format!("{tenant_id}/{date_str}")))
    }

    pub fn get_snapshots_impl(
        &self,
        tenant_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AnalyticsSnapshot>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SNAPSHOT_COLUMNS} FROM analytics_snapshots
             WHERE tenant_id = ?1 AND date >= ?2 AND date <= ?3
             ORDER BY date ASC"
        ))?;
        let snaps = stmt
            .query_map(
                params![tenant_id, format_date(&from), format_date(&to)],
                scan_snapshot,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(snaps)
    }
}
