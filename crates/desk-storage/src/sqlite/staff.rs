//! Staff records and atomic capacity accounting for [`SqliteStore`].

use rusqlite::{Connection, OptionalExtension, Row, params};

use desk_core::staff::{StaffMember, WorkingHours};

use crate::error::{Result, StorageError};
use crate::sqlite::store::SqliteStore;
use crate::sqlite::tickets::{parse_enum, parse_string_list};

const STAFF_COLUMNS: &str = r#"
    id, tenant_id, name, email, specialization, level,
    max_concurrent_tickets, current_ticket_count, is_available,
    work_start, work_end, timezone, skills, languages,
    total_resolved, avg_resolution_time, satisfaction_avg
"#;

fn scan_staff(row: &Row<'_>) -> rusqlite::Result<StaffMember> {
    let specialization: String = row.get(4)?;
    let level: String = row.get(5)?;
    let skills: String = row.get(12)?;
    let languages: String = row.get(13)?;
    Ok(StaffMember {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        specialization: parse_enum(4, &specialization)?,
        level: parse_enum(5, &level)?,
        max_concurrent_tickets: row.get(6)?,
        current_ticket_count: row.get(7)?,
        is_available: row.get(8)?,
        working_hours: WorkingHours {
            start: row.get(9)?,
            end: row.get(10)?,
        },
        timezone: row.get(11)?,
        skills: parse_string_list(12, &skills)?,
        languages: parse_string_list(13, &languages)?,
        total_resolved: row.get(14)?,
        avg_resolution_time: row.get(15)?,
        satisfaction_avg: row.get(16)?,
    })
}

/// Inserts or refreshes a staff row from directory data.
///
/// The live counter and performance counters belong to this store and are
/// never overwritten. Capacity is not lowered below the live count; the
/// difference drains as assigned tickets finish.
pub(crate) fn upsert_staff_on_conn(conn: &Connection, staff: &StaffMember) -> Result<()> {
    let skills = serde_json::to_string(&staff.skills)?;
    let languages = serde_json::to_string(&staff.languages)?;
    conn.execute(
        "INSERT INTO staff (id, tenant_id, name, email, specialization, level,
                            max_concurrent_tickets, is_available, work_start, work_end,
                            timezone, skills, languages)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
         ON CONFLICT(id) DO UPDATE SET
            tenant_id = excluded.tenant_id,
            name = excluded.name,
            email = excluded.email,
            specialization = excluded.specialization,
            level = excluded.level,
            max_concurrent_tickets = MAX(excluded.max_concurrent_tickets, staff.current_ticket_count),
            is_available = excluded.is_available,
            work_start = excluded.work_start,
            work_end = excluded.work_end,
            timezone = excluded.timezone,
            skills = excluded.skills,
            languages = excluded.languages",
        params![
            staff.id,
            staff.tenant_id,
            staff.name,
            staff.email,
            staff.specialization.as_str(),
            staff.level.as_str(),
            staff.max_concurrent_tickets,
            staff.is_available,
            staff.working_hours.start,
            staff.working_hours.end,
            staff.timezone,
            skills,
            languages,
        ],
    )?;
    Ok(())
}

pub(crate) fn get_staff_on_conn(conn: &Connection, id: &str) -> Result<StaffMember> {
    conn.query_row(
        &format!("SELECT {STAFF_COLUMNS} FROM staff WHERE id = ?1"),
        params![id],
        scan_staff,
    )
    .optional()?
    .ok_or_else(|| StorageError::not_found("staff", id))
}

pub(crate) fn list_staff_on_conn(conn: &Connection, tenant_id: &str) -> Result<Vec<StaffMember>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {STAFF_COLUMNS} FROM staff WHERE tenant_id = ?1 ORDER BY id ASC"
    ))?;
    let staff = stmt
        .query_map(params![tenant_id], scan_staff)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(staff)
}

/// The single atomic step of routing: take a unit of capacity only if one is
/// free at the moment the row is written.
pub(crate) fn reserve_on_conn(conn: &Connection, staff_id: &str) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE staff SET current_ticket_count = current_ticket_count + 1
         WHERE id = ?1 AND current_ticket_count < max_concurrent_tickets",
        params![staff_id],
    )?;
    Ok(changed == 1)
}

pub(crate) fn release_on_conn(conn: &Connection, staff_id: &str) -> Result<()> {
    conn.execute(
        "UPDATE staff SET current_ticket_count = MAX(current_ticket_count - 1, 0) WHERE id = ?1",
        params![staff_id],
    )?;
    Ok(())
}

pub(crate) fn count_active_assignments_on_conn(conn: &Connection, staff_id: &str) -> Result<u32> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM tickets
         WHERE assigned_to = ?1 AND status NOT IN ('closed', 'cancelled')",
        params![staff_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub(crate) fn set_ticket_count_on_conn(conn: &Connection, staff_id: &str, count: u32) -> Result<()> {
    let changed = conn.execute(
        "UPDATE staff SET current_ticket_count = ?2,
                          max_concurrent_tickets = MAX(max_concurrent_tickets, ?2)
         WHERE id = ?1",
        params![staff_id, count],
    )?;
    if changed == 0 {
        return Err(StorageError::not_found("staff", staff_id));
    }
    Ok(())
}

/// Running mean: `avg' = (avg * n + hours) / (n + 1)`.
pub(crate) fn record_resolution_on_conn(conn: &Connection, staff_id: &str, hours: f64) -> Result<()> {
    conn.execute(
        "UPDATE staff SET
            avg_resolution_time = (COALESCE(avg_resolution_time, 0) * total_resolved + ?2)
                                  / (total_resolved + 1),
            total_resolved = total_resolved + 1
         WHERE id = ?1",
        params![staff_id, hours],
    )?;
    Ok(())
}

pub(crate) fn refresh_satisfaction_on_conn(conn: &Connection, staff_id: &str) -> Result<()> {
    conn.execute(
        "UPDATE staff SET satisfaction_avg = (
            SELECT AVG(satisfaction_rating) FROM tickets
            WHERE assigned_to = ?1 AND satisfaction_rating IS NOT NULL
         )
         WHERE id = ?1",
        params![staff_id],
    )?;
    Ok(())
}

// ---------------------------------------------------------------------------
// SqliteStore staff methods
// ---------------------------------------------------------------------------

impl SqliteStore {
    pub fn upsert_staff_impl(&self, staff: &StaffMember) -> Result<()> {
        let conn = self.lock_conn()?;
        upsert_staff_on_conn(&conn, staff)
    }

    pub fn get_staff_impl(&self, id: &str) -> Result<StaffMember> {
        let conn = self.lock_conn()?;
        get_staff_on_conn(&conn, id)
    }

    pub fn list_staff_impl(&self, tenant_id: &str) -> Result<Vec<StaffMember>> {
        let conn = self.lock_conn()?;
        list_staff_on_conn(&conn, tenant_id)
    }

    pub fn reserve_impl(&self, staff_id: &str) -> Result<bool> {
        let conn = self.lock_conn()?;
        reserve_on_conn(&conn, staff_id)
    }

    pub fn release_impl(&self, staff_id: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        release_on_conn(&conn, staff_id)
    }

    pub fn count_active_assignments_impl(&self, staff_id: &str) -> Result<u32> {
        let conn = self.lock_conn()?;
        count_active_assignments_on_conn(&conn, staff_id)
    }

    pub fn set_ticket_count_impl(&self, staff_id: &str, count: u32) -> Result<()> {
        let conn = self.lock_conn()?;
        set_ticket_count_on_conn(&conn, staff_id, count)
    }
}
