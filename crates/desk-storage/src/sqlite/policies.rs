//! SLA policy table for [`SqliteStore`].

use chrono::Duration;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};

use desk_core::duration::duration_from_secs;
use desk_core::enums::{Category, Priority};
use desk_core::sla::SlaPolicy;

use crate::error::Result;
use crate::sqlite::store::SqliteStore;
use crate::sqlite::tickets::parse_enum;

const POLICY_COLUMNS: &str = r#"
    id, tenant_id, name, priority, category,
    first_response_secs, resolution_secs, escalation_secs,
    escalation_level, is_active
"#;

/// Wildcard category is stored as the empty string.
fn category_key(category: Option<Category>) -> &'static str {
    category.map(|c| c.as_str()).unwrap_or("")
}

/// Parses a whole-seconds INTEGER column.
fn duration_column(idx: usize, secs: i64) -> rusqlite::Result<Duration> {
    duration_from_secs(secs)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e)))
}

fn scan_policy(row: &Row<'_>) -> rusqlite::Result<SlaPolicy> {
    let priority: String = row.get(3)?;
    let category: String = row.get(4)?;
    let category = if category.is_empty() {
        None
    } else {
        Some(parse_enum(4, &category)?)
    };
    Ok(SlaPolicy {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        name: row.get(2)?,
        priority: parse_enum(3, &priority)?,
        category,
        first_response_target: duration_column(5, row.get(5)?)?,
        resolution_target: duration_column(6, row.get(6)?)?,
        escalation_time: duration_column(7, row.get(7)?)?,
        escalation_level: row.get(8)?,
        is_active: row.get(9)?,
    })
}

impl SqliteStore {
    pub fn upsert_policy_impl(&self, policy: &SlaPolicy) -> Result<SlaPolicy> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO sla_policies (tenant_id, name, priority, category,
                                       first_response_secs, resolution_secs, escalation_secs,
                                       escalation_level, is_active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(tenant_id, priority, category) DO UPDATE SET
                name = excluded.name,
                first_response_secs = excluded.first_response_secs,
                resolution_secs = excluded.resolution_secs,
                escalation_secs = excluded.escalation_secs,
                escalation_level = excluded.escalation_level,
                is_active = excluded.is_active",
            params![
                policy.tenant_id,
                policy.name,
                policy.priority.as_str(),
                category_key(policy.category),
                policy.first_response_target.num_seconds(),
                policy.resolution_target.num_seconds(),
                policy.escalation_time.num_seconds(),
                policy.escalation_level,
                policy.is_active,
            ],
        )?;
        let stored = conn.query_row(
            &format!(
                "SELECT {POLICY_COLUMNS} FROM sla_policies
                 WHERE tenant_id = ?1 AND priority = ?2 AND category = ?3"
            ),
            params![
                policy.tenant_id,
                policy.priority.as_str(),
                category_key(policy.category)
            ],
            scan_policy,
        )?;
        Ok(stored)
    }

    pub fn find_policy_impl(
        &self,
        tenant_id: &str,
        priority: Priority,
        category: Option<Category>,
    ) -> Result<Option<SlaPolicy>> {
        let conn = self.lock_conn()?;
        find_policy_on_conn(&conn, tenant_id, priority, category)
    }

    pub fn list_policies_impl(&self, tenant_id: &str) -> Result<Vec<SlaPolicy>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {POLICY_COLUMNS} FROM sla_policies WHERE tenant_id = ?1
             ORDER BY priority, category"
        ))?;
        let policies = stmt
            .query_map(params![tenant_id], scan_policy)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(policies)
    }
}

pub(crate) fn find_policy_on_conn(
    conn: &Connection,
    tenant_id: &str,
    priority: Priority,
    category: Option<Category>,
) -> Result<Option<SlaPolicy>> {
    let policy = conn
        .query_row(
            &format!(
                "SELECT {POLICY_COLUMNS} FROM sla_policies
                 WHERE tenant_id = ?1 AND priority = ?2 AND category = ?3 AND is_active = 1"
            ),
            params![tenant_id, priority.as_str(), category_key(category)],
            scan_policy,
        )
        .optional()?;
    Ok(policy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(category: Option<Category>, level: u32) -> SlaPolicy {
        SlaPolicy::new(
            "t1",
            Priority::High,
            category,
            Duration::hours(1),
            Duration::hours(8),
            level,
        )
    }

    #[test]
    fn upsert_replaces_same_key() {
        let store = SqliteStore::open_in_memory().unwrap();
        let first = store.upsert_policy_impl(&policy(None, 1)).unwrap();
        let second = store.upsert_policy_impl(&policy(None, 2)).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.escalation_level, 2);
        assert_eq!(store.list_policies_impl("t1").unwrap().len(), 1);
    }

    #[test]
    fn wildcard_and_exact_are_distinct() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert_policy_impl(&policy(None, 1)).unwrap();
        store
            .upsert_policy_impl(&policy(Some(Category::Technical), 2))
            .unwrap();

        let exact = store
            .find_policy_impl("t1", Priority::High, Some(Category::Technical))
            .unwrap()
            .unwrap();
        assert_eq!(exact.escalation_level, 2);
        assert_eq!(exact.first_response_target, Duration::hours(1));

        let wildcard = store
            .find_policy_impl("t1", Priority::High, None)
            .unwrap()
            .unwrap();
        assert_eq!(wildcard.category, None);

        assert!(
            store
                .find_policy_impl("t1", Priority::Low, None)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn inactive_policy_is_not_found() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut p = policy(None, 1);
        p.is_active = false;
        store.upsert_policy_impl(&p).unwrap();
        assert!(
            store
                .find_policy_impl("t1", Priority::High, None)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn unrepresentable_target_is_a_row_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert_policy_impl(&policy(None, 1)).unwrap();
        store
            .lock_conn()
            .unwrap()
            .execute("UPDATE sla_policies SET resolution_secs = ?1", [i64::MAX])
            .unwrap();
        assert!(store.list_policies_impl("t1").is_err());
    }
}
