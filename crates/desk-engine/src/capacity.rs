//! Staff directory mirror and capacity tracking.
//!
//! The store owns every staff member's live `current_ticket_count`. The only
//! writes to it are the conditional reserve (a single
//! `UPDATE ... WHERE current_ticket_count < max_concurrent_tickets`), the
//! floored release, and the reconciliation job in this module.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use desk_core::enums::{Category, StaffLevel};
use desk_core::staff::StaffMember;
use desk_core::validation::validate_staff;
use desk_storage::Storage;

use crate::directory::Directory;
use crate::error::{EngineError, Result};

/// One counter repaired by [`CapacityTracker::reconcile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountCorrection {
    pub staff_id: String,
    pub recorded: u32,
    pub actual: u32,
}

/// Outcome of [`CapacityTracker::sync_directory`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub upserted: usize,
    /// Directory entries rejected by validation, with the reason.
    pub skipped: Vec<(String, String)>,
}

/// Ranks eligible staff and moves capacity units.
#[derive(Clone)]
pub struct CapacityTracker {
    store: Arc<dyn Storage>,
    senior_levels: Vec<StaffLevel>,
}

impl CapacityTracker {
    pub fn new(store: Arc<dyn Storage>, senior_levels: Vec<StaffLevel>) -> Self {
        Self {
            store,
            senior_levels,
        }
    }

    /// Available staff of the tenant who serve `category` and have a free
    /// slot, least loaded first.
    ///
    /// Ties on workload go to the staff member with fewer resolved tickets,
    /// then to the lower id, so the order is total.
    pub fn candidates(&self, tenant_id: &str, category: Category) -> Result<Vec<StaffMember>> {
        let mut staff: Vec<StaffMember> = self
            .store
            .list_staff(tenant_id)?
            .into_iter()
            .filter(|s| s.serves(category) && s.has_capacity())
            .collect();
        staff.sort_by(rank);
        debug!(tenant_id, %category, count = staff.len(), "routing candidates");
        Ok(staff)
    }

    /// [`candidates`](Self::candidates) restricted to the senior pool.
    pub fn senior_candidates(
        &self,
        tenant_id: &str,
        category: Category,
    ) -> Result<Vec<StaffMember>> {
        Ok(self
            .candidates(tenant_id, category)?
            .into_iter()
            .filter(|s| self.senior_levels.contains(&s.level))
            .collect())
    }

    pub fn is_senior(&self, level: StaffLevel) -> bool {
        self.senior_levels.contains(&level)
    }

    /// Takes one unit of capacity; `false` when the staff member is full.
    pub fn reserve(&self, staff_id: &str) -> Result<bool> {
        Ok(self.store.reserve(staff_id)?)
    }

    pub fn release(&self, staff_id: &str) -> Result<()> {
        Ok(self.store.release(staff_id)?)
    }

    pub fn is_overloaded(&self, staff_id: &str) -> Result<bool> {
        Ok(self.store.get_staff(staff_id)?.is_overloaded())
    }

    /// Copies the directory's roster for `tenant_id` into the store.
    ///
    /// Existing rows keep their live counter and performance counters.
    /// Invalid entries are skipped and reported, not fatal.
    pub fn sync_directory(&self, directory: &dyn Directory, tenant_id: &str) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        for member in directory.get_staff_directory(tenant_id)? {
            if let Err(e) = validate_staff(&member) {
                warn!(staff_id = %member.id, error = %e, "skipping invalid directory entry");
                report.skipped.push((member.id.clone(), e.to_string()));
                continue;
            }
            self.store.upsert_staff(&member)?;
            report.upserted += 1;
        }
        info!(tenant_id, upserted = report.upserted, "staff directory synced");
        Ok(report)
    }

    /// Recomputes every counter of the tenant from the ticket table.
    ///
    /// Returns the counters that had drifted, after repairing them.
    pub fn reconcile(&self, tenant_id: &str) -> Result<Vec<CountCorrection>> {
        let mut corrections = Vec::new();
        for member in self.store.list_staff(tenant_id)? {
            let actual = self.store.count_active_assignments(&member.id)?;
            if actual != member.current_ticket_count {
                warn!(
                    staff_id = %member.id,
                    recorded = member.current_ticket_count,
                    actual,
                    "repairing capacity counter"
                );
                self.store.set_ticket_count(&member.id, actual)?;
                corrections.push(CountCorrection {
                    staff_id: member.id,
                    recorded: member.current_ticket_count,
                    actual,
                });
            }
        }
        Ok(corrections)
    }

    /// Fetches a staff member who must belong to `tenant_id`.
    pub(crate) fn staff_in_tenant(&self, staff_id: &str, tenant_id: &str) -> Result<StaffMember> {
        let staff = self.store.get_staff(staff_id)?;
        if staff.tenant_id != tenant_id {
            return Err(EngineError::not_found("staff", staff_id));
        }
        Ok(staff)
    }
}

fn rank(a: &StaffMember, b: &StaffMember) -> Ordering {
    a.workload_percentage()
        .total_cmp(&b.workload_percentage())
        .then(a.total_resolved.cmp(&b.total_resolved))
        .then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::InMemoryDirectory;
    use desk_core::staff::Tenant;
    use desk_core::ticket::TicketDraft;
    use desk_storage::SqliteStore;
    use pretty_assertions::assert_eq;

    fn tracker() -> (Arc<SqliteStore>, CapacityTracker) {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let tracker = CapacityTracker::new(store.clone(), StaffLevel::SENIOR_POOL.to_vec());
        (store, tracker)
    }

    fn staff(id: &str, spec: Category, level: StaffLevel, cap: u32) -> StaffMember {
        StaffMember::new(id, "t1", spec, level, cap)
    }

    #[test]
    fn candidates_filter_and_rank() {
        let (store, tracker) = tracker();
        store.upsert_staff(&staff("a", Category::Technical, StaffLevel::Mid, 4)).unwrap();
        store.upsert_staff(&staff("b", Category::General, StaffLevel::Mid, 2)).unwrap();
        store.upsert_staff(&staff("c", Category::Billing, StaffLevel::Mid, 2)).unwrap();
        let mut away = staff("d", Category::Technical, StaffLevel::Mid, 2);
        away.is_available = false;
        store.upsert_staff(&away).unwrap();

        // a: 1/4 = 25%, b: 1/2 = 50%.
        assert!(store.reserve("a").unwrap());
        assert!(store.reserve("b").unwrap());

        let ids: Vec<String> = tracker
            .candidates("t1", Category::Technical)
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn full_staff_are_not_candidates() {
        let (store, tracker) = tracker();
        store.upsert_staff(&staff("a", Category::Technical, StaffLevel::Mid, 1)).unwrap();
        assert!(tracker.reserve("a").unwrap());
        assert!(tracker.is_overloaded("a").unwrap());
        assert!(tracker.candidates("t1", Category::Technical).unwrap().is_empty());
        assert!(!tracker.reserve("a").unwrap());

        tracker.release("a").unwrap();
        assert_eq!(tracker.candidates("t1", Category::Technical).unwrap().len(), 1);
    }

    #[test]
    fn ties_break_on_resolved_then_id() {
        let (store, tracker) = tracker();
        store.upsert_staff(&staff("b", Category::Technical, StaffLevel::Mid, 2)).unwrap();
        store.upsert_staff(&staff("a", Category::Technical, StaffLevel::Mid, 2)).unwrap();
        store.upsert_staff(&staff("c", Category::Technical, StaffLevel::Mid, 2)).unwrap();
        store
            .run_in_transaction(&|tx| tx.record_resolution("a", 2.0))
            .unwrap();

        let ids: Vec<String> = tracker
            .candidates("t1", Category::Technical)
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["b".to_string(), "c".to_string(), "a".to_string()]);
    }

    #[test]
    fn senior_pool_only() {
        let (store, tracker) = tracker();
        store.upsert_staff(&staff("j", Category::Technical, StaffLevel::Junior, 2)).unwrap();
        store.upsert_staff(&staff("l", Category::Technical, StaffLevel::Lead, 2)).unwrap();
        let seniors = tracker.senior_candidates("t1", Category::Technical).unwrap();
        assert_eq!(seniors.len(), 1);
        assert_eq!(seniors[0].id, "l");
    }

    #[test]
    fn sync_skips_invalid_entries() {
        let (store, tracker) = tracker();
        let dir = InMemoryDirectory::new()
            .with_tenant(Tenant::new("t1", "Acme"))
            .with_staff(staff("ok", Category::Technical, StaffLevel::Mid, 2))
            .with_staff(staff("zero", Category::Technical, StaffLevel::Mid, 0));

        let report = tracker.sync_directory(&dir, "t1").unwrap();
        assert_eq!(report.upserted, 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].0, "zero");
        assert!(store.get_staff("ok").is_ok());
    }

    #[test]
    fn reconcile_repairs_drift() {
        let (store, tracker) = tracker();
        store.upsert_staff(&staff("a", Category::Technical, StaffLevel::Mid, 3)).unwrap();

        let mut ticket = TicketDraft::new("t1", "Analyzer offline", "alice")
            .into_ticket("tk-1", chrono::Utc::now());
        ticket.assigned_to = Some("a".into());
        store.create_ticket(&ticket, "alice").unwrap();

        // Counter says 2, the ticket table says 1.
        assert!(store.reserve("a").unwrap());
        assert!(store.reserve("a").unwrap());

        let fixes = tracker.reconcile("t1").unwrap();
        assert_eq!(
            fixes,
            vec![CountCorrection {
                staff_id: "a".into(),
                recorded: 2,
                actual: 1
            }]
        );
        assert_eq!(store.get_staff("a").unwrap().current_ticket_count, 1);
        assert!(tracker.reconcile("t1").unwrap().is_empty());
    }

    #[test]
    fn staff_from_other_tenant_is_not_found() {
        let (store, tracker) = tracker();
        store
            .upsert_staff(&StaffMember::new("x", "t2", Category::General, StaffLevel::Mid, 2))
            .unwrap();
        assert!(tracker.staff_in_tenant("x", "t1").unwrap_err().is_not_found());
        assert!(tracker.staff_in_tenant("x", "t2").is_ok());
    }
}
