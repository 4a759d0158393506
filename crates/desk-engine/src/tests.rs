//! End-to-end engine behaviour over an in-memory store.

use std::sync::Arc;
use std::thread;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use pretty_assertions::assert_eq;

use desk_core::enums::{BreachKind, Category, EventType, MessageType, Priority, StaffLevel, TicketStatus};
use desk_core::filter::TicketFilter;
use desk_core::message::NewMessage;
use desk_core::sla::SlaPolicy;
use desk_core::staff::{StaffMember, Tenant};
use desk_core::ticket::TicketDraft;
use desk_storage::{SqliteStore, Storage};

use crate::directory::InMemoryDirectory;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::notify::ChannelNotifier;

struct Desk {
    store: Arc<SqliteStore>,
    directory: Arc<InMemoryDirectory>,
    engine: Engine,
}

fn desk() -> Desk {
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let directory = Arc::new(
        InMemoryDirectory::new()
            .with_tenant(Tenant::new("t1", "Acme Lab"))
            .with_tenant(Tenant::new("t2", "Other Lab"))
            .with_tenant(Tenant {
                id: "t0".into(),
                name: "Closed Lab".into(),
                is_active: false,
            }),
    );
    let engine = Engine::new(store.clone(), directory.clone());
    Desk {
        store,
        directory,
        engine,
    }
}

impl Desk {
    fn staff(&self, id: &str, spec: Category, level: StaffLevel, cap: u32) {
        self.directory
            .add_staff(StaffMember::new(id, "t1", spec, level, cap));
        self.engine.sync_staff("t1").unwrap();
    }

    /// (t1, high, technical): first response 1h, resolution 8h, level `level`.
    fn policy(&self, level: u32) {
        self.engine
            .set_policy(&SlaPolicy::new(
                "t1",
                Priority::High,
                Some(Category::Technical),
                Duration::hours(1),
                Duration::hours(8),
                level,
            ))
            .unwrap();
    }

    fn count(&self, staff_id: &str) -> u32 {
        self.store.get_staff(staff_id).unwrap().current_ticket_count
    }

    /// The capacity invariant for every staff member of t1.
    fn assert_counts_consistent(&self) {
        for member in self.store.list_staff("t1").unwrap() {
            assert_eq!(
                member.current_ticket_count,
                self.store.count_active_assignments(&member.id).unwrap(),
                "counter drift for {}",
                member.id
            );
        }
    }
}

fn technical(title: &str) -> TicketDraft {
    TicketDraft::new("t1", title, "alice")
        .priority(Priority::High)
        .category(Category::Technical)
}

// ---------------------------------------------------------------------------
// Creation and routing
// ---------------------------------------------------------------------------

#[test]
fn capacity_limits_routing() {
    let d = desk();
    d.staff("s1", Category::Technical, StaffLevel::Mid, 2);
    d.policy(1);

    let a = d.engine.create(technical("Analyzer offline")).unwrap();
    let b = d.engine.create(technical("Export stuck")).unwrap();
    let c = d.engine.create(technical("Login loop")).unwrap();

    assert_eq!(a.assigned_to.as_deref(), Some("s1"));
    assert_eq!(b.assigned_to.as_deref(), Some("s1"));
    assert_eq!(a.status, TicketStatus::Pending);
    assert_eq!(c.assigned_to, None);
    assert_eq!(c.status, TicketStatus::Open);
    assert_eq!(d.count("s1"), 2);
    d.assert_counts_consistent();
}

#[test]
fn create_sets_deadlines_from_policy() {
    let d = desk();
    d.policy(1);
    let now = Utc::now();
    let t = d.engine.create_at(technical("Analyzer offline"), now).unwrap();
    assert_eq!(t.first_response_due_at, Some(now + Duration::hours(1)));
    assert_eq!(t.estimated_resolution_time, Some(now + Duration::hours(8)));
    assert_eq!(t.escalation_level, 0);
    assert!(t.id.starts_with("tk-"));
}

#[test]
fn oversized_policy_targets_are_rejected() {
    let d = desk();
    d.staff("s1", Category::Technical, StaffLevel::Mid, 2);
    let huge = desk_core::duration::parse_duration("100000000000d").unwrap();
    let err = d
        .engine
        .set_policy(&SlaPolicy::new(
            "t1",
            Priority::High,
            Some(Category::Technical),
            huge,
            huge,
            1,
        ))
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert!(d.engine.list_policies("t1").unwrap().is_empty());

    let t = d.engine.create(technical("Analyzer offline")).unwrap();
    assert_eq!(t.first_response_due_at, None);
}

#[test]
fn create_without_policy_stays_unassigned() {
    let d = desk();
    d.staff("s1", Category::Technical, StaffLevel::Mid, 2);
    let t = d
        .engine
        .create(TicketDraft::new("t1", "Billing question", "alice").category(Category::Billing))
        .unwrap();
    assert_eq!(t.status, TicketStatus::Open);
    assert_eq!(t.assigned_to, None);
    assert_eq!(t.first_response_due_at, None);
}

#[test]
fn create_rejects_bad_input_and_tenants() {
    let d = desk();
    let err = d.engine.create(TicketDraft::new("t1", "  ", "alice")).unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = d.engine.create(TicketDraft::new("t9", "Hello", "alice")).unwrap_err();
    assert!(err.is_not_found());

    let err = d.engine.create(TicketDraft::new("t0", "Hello", "alice")).unwrap_err();
    assert!(matches!(err, EngineError::TenantInactive(_)));

    assert!(d.store.list_tickets(&TicketFilter::default()).unwrap().is_empty());
}

#[test]
fn general_staff_take_any_category() {
    let d = desk();
    d.staff("g1", Category::General, StaffLevel::Mid, 1);
    d.policy(1);
    let t = d.engine.create(technical("Analyzer offline")).unwrap();
    assert_eq!(t.assigned_to.as_deref(), Some("g1"));
}

#[test]
fn concurrent_creation_never_overcommits() {
    let d = desk();
    d.staff("s1", Category::Technical, StaffLevel::Mid, 2);
    d.staff("s2", Category::Technical, StaffLevel::Junior, 1);
    d.policy(1);
    let engine = Arc::new(d.engine);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                engine
                    .create(technical(&format!("Ticket {i}")))
                    .unwrap()
            })
        })
        .collect();
    let tickets: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let assigned = tickets.iter().filter(|t| t.assigned_to.is_some()).count();
    assert_eq!(assigned, 3);
    assert_eq!(d.store.get_staff("s1").unwrap().current_ticket_count, 2);
    assert_eq!(d.store.get_staff("s2").unwrap().current_ticket_count, 1);
    for member in d.store.list_staff("t1").unwrap() {
        assert_eq!(
            member.current_ticket_count,
            d.store.count_active_assignments(&member.id).unwrap()
        );
    }
}

// ---------------------------------------------------------------------------
// Assignment
// ---------------------------------------------------------------------------

#[test]
fn manual_assignment_rules() {
    let d = desk();
    d.staff("s1", Category::Technical, StaffLevel::Mid, 1);
    d.staff("s2", Category::Technical, StaffLevel::Mid, 2);
    d.store
        .upsert_staff(&StaffMember::new("x1", "t2", Category::Technical, StaffLevel::Mid, 2))
        .unwrap();

    // No policy: tickets stay unassigned until assigned by hand.
    let a = d.engine.create(technical("A")).unwrap();
    let b = d.engine.create(technical("B")).unwrap();

    let a = d.engine.assign(&a.id, "s1", "lead").unwrap();
    assert_eq!(a.status, TicketStatus::Pending);
    assert_eq!(d.count("s1"), 1);

    // Full.
    let err = d.engine.assign(&b.id, "s1", "lead").unwrap_err();
    assert!(matches!(err, EngineError::CapacityExhausted { .. }));

    // Other tenant's staff.
    assert!(d.engine.assign(&b.id, "x1", "lead").unwrap_err().is_not_found());

    // Reassignment moves the unit.
    d.engine.assign(&a.id, "s2", "lead").unwrap();
    assert_eq!(d.count("s1"), 0);
    assert_eq!(d.count("s2"), 1);

    // Terminal tickets cannot be assigned.
    d.engine.cancel(&b.id, "duplicate", "alice").unwrap();
    let err = d.engine.assign(&b.id, "s1", "lead").unwrap_err();
    assert!(matches!(err, EngineError::AssignmentConflict { .. }));
    d.assert_counts_consistent();
}

#[test]
fn assignment_notifies_staff() {
    let d = desk();
    d.staff("s1", Category::Technical, StaffLevel::Mid, 2);
    d.policy(1);
    let (notifier, rx) = ChannelNotifier::new();
    let engine = Engine::new(d.store.clone(), d.directory.clone()).with_notifier(Arc::new(notifier));

    let t = engine.create(technical("Analyzer offline")).unwrap();
    let deliveries: Vec<_> = rx.try_iter().collect();
    let assigned = deliveries
        .iter()
        .find(|d| d.event().unwrap().name == "ticket.assigned")
        .unwrap();
    assert_eq!(assigned.recipient, "s1");
    assert_eq!(assigned.event().unwrap().ticket_id, t.id);
}

// ---------------------------------------------------------------------------
// Lifecycle transitions
// ---------------------------------------------------------------------------

#[test]
fn close_requires_resolved_unless_forced() {
    let d = desk();
    d.staff("s1", Category::Technical, StaffLevel::Mid, 2);
    d.policy(1);
    let t = d.engine.create(technical("Analyzer offline")).unwrap();
    assert_eq!(t.status, TicketStatus::Pending);

    let err = d.engine.close(&t.id, false, "s1").unwrap_err();
    assert!(err.is_invalid_state());
    assert_eq!(d.count("s1"), 1);

    d.engine.start_work(&t.id, "s1").unwrap();
    let resolved = d.engine.resolve(&t.id, "Replaced the fuse", "s1").unwrap();
    assert_eq!(resolved.status, TicketStatus::Resolved);
    assert!(resolved.resolved_at.is_some());
    assert_eq!(resolved.actual_resolution_time, None);
    // Resolved tickets still hold capacity.
    assert_eq!(d.count("s1"), 1);

    let closed = d.engine.close(&t.id, false, "s1").unwrap();
    assert_eq!(closed.status, TicketStatus::Closed);
    assert!(closed.actual_resolution_time.is_some());
    assert_eq!(d.count("s1"), 0);
    assert_eq!(d.store.get_staff("s1").unwrap().total_resolved, 1);

    assert!(d.engine.close(&t.id, true, "s1").unwrap_err().is_invalid_state());
    d.assert_counts_consistent();
}

#[test]
fn forced_close_from_open() {
    let d = desk();
    let t = d.engine.create(technical("Analyzer offline")).unwrap();
    let closed = d.engine.close(&t.id, true, "lead").unwrap();
    assert_eq!(closed.status, TicketStatus::Closed);
}

#[test]
fn start_work_only_from_pending() {
    let d = desk();
    let t = d.engine.create(technical("Analyzer offline")).unwrap();
    assert!(d.engine.start_work(&t.id, "s1").unwrap_err().is_invalid_state());
    assert!(d.engine.resolve(&t.id, "", "s1").unwrap_err().is_invalid_state());
}

#[test]
fn cancel_releases_without_resolution_time() {
    let d = desk();
    d.staff("s1", Category::Technical, StaffLevel::Mid, 2);
    d.policy(1);
    let t = d.engine.create(technical("Analyzer offline")).unwrap();
    let cancelled = d.engine.cancel(&t.id, "reporter withdrew", "alice").unwrap();
    assert_eq!(cancelled.status, TicketStatus::Cancelled);
    assert_eq!(cancelled.actual_resolution_time, None);
    assert_eq!(cancelled.cancel_reason, "reporter withdrew");
    assert_eq!(d.count("s1"), 0);
    assert!(d.engine.cancel(&t.id, "", "alice").unwrap_err().is_invalid_state());
}

#[test]
fn first_response_only_from_public_staff_message() {
    let d = desk();
    d.staff("s1", Category::Technical, StaffLevel::Mid, 2);
    d.policy(1);
    let t = d.engine.create(technical("Analyzer offline")).unwrap();

    d.engine
        .add_message(&t.id, NewMessage::new("alice", "Any update?"))
        .unwrap();
    d.engine
        .add_message(&t.id, NewMessage::new("s1", "checking logs").internal(true))
        .unwrap();
    assert_eq!(d.engine.get_ticket(&t.id).unwrap().first_response_time, None);

    let first = Utc::now();
    d.engine
        .add_message_at(
            &t.id,
            NewMessage::new("s1", "Looking into it").message_type(MessageType::Support),
            first,
        )
        .unwrap();
    d.engine
        .add_message_at(
            &t.id,
            NewMessage::new("s1", "Fixed").message_type(MessageType::Support),
            first + Duration::minutes(5),
        )
        .unwrap();

    let ticket = d.engine.get_ticket(&t.id).unwrap();
    assert_eq!(ticket.first_response_time, Some(first));
    assert_eq!(d.engine.get_messages(&t.id).unwrap().len(), 4);

    let first_events = d
        .engine
        .get_events(&t.id, 0)
        .unwrap()
        .into_iter()
        .filter(|e| e.event_type == EventType::FirstResponse)
        .count();
    assert_eq!(first_events, 1);
}

#[test]
fn messages_rejected_on_terminal_ticket() {
    let d = desk();
    let t = d.engine.create(technical("Analyzer offline")).unwrap();
    d.engine.cancel(&t.id, "", "alice").unwrap();
    let err = d
        .engine
        .add_message(&t.id, NewMessage::new("alice", "hello?"))
        .unwrap_err();
    assert!(err.is_invalid_state());

    let err = d.engine.add_message(&t.id, NewMessage::new("alice", " ")).unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[test]
fn rating_rules_and_snapshot() {
    let d = desk();
    d.staff("s1", Category::Technical, StaffLevel::Mid, 2);
    d.policy(1);
    let t = d.engine.create(technical("Analyzer offline")).unwrap();

    let err = d.engine.rate_satisfaction(&t.id, 5, "", "alice").unwrap_err();
    assert!(err.is_invalid_state());

    d.engine.resolve(&t.id, "done", "s1").unwrap();
    d.engine.close(&t.id, false, "s1").unwrap();

    let err = d.engine.rate_satisfaction(&t.id, 6, "", "alice").unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let rated = d.engine.rate_satisfaction(&t.id, 5, "great", "alice").unwrap();
    assert_eq!(rated.satisfaction_rating, Some(5));
    assert_eq!(d.store.get_staff("s1").unwrap().satisfaction_avg, Some(5.0));

    let today = Utc::now().date_naive();
    let snap = d.engine.compute_snapshot("t1", today).unwrap();
    assert_eq!(snap.satisfaction_avg, Some(5.0));
    assert_eq!(snap.closed_tickets, 1);
    assert_eq!(snap.active_staff_count, 1);

    // Recompute is idempotent.
    let again = d.engine.compute_snapshot("t1", today).unwrap();
    assert_eq!(again, snap);
    assert_eq!(d.engine.get_snapshot("t1", today).unwrap(), snap);
    assert_eq!(d.engine.get_snapshots("t1", today, today).unwrap(), vec![snap]);
}

#[test]
fn compute_range_covers_each_day() {
    let d = desk();
    let today = Utc::now().date_naive();
    let from = today - Duration::days(2);
    let snaps = d.engine.compute_range("t1", from, today).unwrap();
    assert_eq!(snaps.len(), 3);
    assert_eq!(d.engine.get_snapshots("t1", from, today).unwrap(), snaps);
    assert!(d.engine.compute_range("t1", today, from).unwrap().is_empty());
}

#[test]
fn backfilled_day_keeps_ticket_open() {
    let d = desk();
    let created = Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap();
    let t = d.engine.create_at(technical("Analyzer offline"), created).unwrap();
    d.engine
        .close_at(&t.id, true, "lead", created + Duration::days(2))
        .unwrap();

    let day10 = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
    let snap = d.engine.compute_snapshot("t1", day10).unwrap();
    assert_eq!(snap.open_tickets, 1);
    assert_eq!(snap.closed_tickets, 0);
    assert_eq!(snap.avg_resolution_time, None);

    let day12 = NaiveDate::from_ymd_opt(2026, 3, 12).unwrap();
    let snap = d.engine.compute_snapshot("t1", day12).unwrap();
    assert_eq!(snap.closed_tickets, 1);
    assert_eq!(snap.avg_resolution_time, Some(48.0));
}

#[test]
fn resolved_tickets_count_toward_resolution_time() {
    let d = desk();
    d.staff("s1", Category::Technical, StaffLevel::Mid, 2);
    d.policy(1);
    let t = d.engine.create(technical("Analyzer offline")).unwrap();
    d.engine.resolve(&t.id, "Replaced the fuse", "s1").unwrap();

    let snap = d.engine.compute_snapshot("t1", Utc::now().date_naive()).unwrap();
    assert_eq!(snap.resolved_tickets, 1);
    assert!(snap.avg_resolution_time.is_some());
}

// ---------------------------------------------------------------------------
// Escalation
// ---------------------------------------------------------------------------

#[test]
fn sweep_escalates_unanswered_ticket() {
    let d = desk();
    d.staff("s1", Category::Technical, StaffLevel::Mid, 2);
    d.policy(1);
    let now = Utc::now();
    let t = d
        .engine
        .create_at(technical("Analyzer offline"), now - Duration::hours(2))
        .unwrap();

    let report = d.engine.sweep_at(now).unwrap();
    assert_eq!(report.escalated, 1);
    assert_eq!(report.errors, 0);

    let ticket = d.engine.get_ticket(&t.id).unwrap();
    assert_eq!(ticket.escalation_level, 1);
    assert!(ticket.is_escalated);
    assert_eq!(ticket.assigned_to.as_deref(), Some("s1"));

    let records = d.engine.get_escalations(&t.id).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, BreachKind::FirstResponse);
    assert!(
        d.engine
            .get_messages(&t.id)
            .unwrap()
            .iter()
            .any(|m| m.message_type == MessageType::Escalation)
    );

    // Nothing left to do.
    let report = d.engine.sweep_at(now).unwrap();
    assert_eq!(report.escalated, 0);
    assert_eq!(d.engine.get_ticket(&t.id).unwrap().escalation_level, 1);
}

#[test]
fn sweep_escalates_overdue_resolution_once() {
    let d = desk();
    d.staff("s1", Category::Technical, StaffLevel::Mid, 2);
    d.policy(1);
    let now = Utc::now();
    let t = d
        .engine
        .create_at(technical("Analyzer offline"), now - Duration::hours(12))
        .unwrap();
    d.engine
        .add_message_at(
            &t.id,
            NewMessage::new("s1", "On it").message_type(MessageType::Support),
            now - Duration::hours(11) - Duration::minutes(30),
        )
        .unwrap();

    let report = d.engine.sweep_at(now).unwrap();
    assert_eq!(report.escalated, 1);
    let ticket = d.engine.get_ticket(&t.id).unwrap();
    assert_eq!(ticket.escalation_level, 1);

    let report = d.engine.sweep_at(now + Duration::hours(1)).unwrap();
    assert_eq!(report.escalated, 0);
    let kinds: Vec<BreachKind> = d
        .engine
        .get_escalations(&t.id)
        .unwrap()
        .into_iter()
        .map(|r| r.kind)
        .collect();
    assert_eq!(kinds, vec![BreachKind::Resolution]);
}

#[test]
fn sweep_routes_waiting_tickets_when_capacity_frees() {
    let d = desk();
    d.staff("s1", Category::Technical, StaffLevel::Mid, 1);
    d.policy(1);
    let a = d.engine.create(technical("A")).unwrap();
    let b = d.engine.create(technical("B")).unwrap();
    assert_eq!(b.assigned_to, None);

    d.engine.cancel(&a.id, "", "alice").unwrap();
    let report = d.engine.sweep().unwrap();
    assert_eq!(report.assigned, 1);
    assert_eq!(d.engine.get_ticket(&b.id).unwrap().assigned_to.as_deref(), Some("s1"));
    d.assert_counts_consistent();
}

#[test]
fn high_escalation_reroutes_to_senior() {
    let d = desk();
    d.staff("s1", Category::Technical, StaffLevel::Mid, 2);
    d.staff("z-lead", Category::Technical, StaffLevel::Lead, 1);
    d.policy(1);

    let t = d.engine.create(technical("Analyzer offline")).unwrap();
    assert_eq!(t.assigned_to.as_deref(), Some("s1"));

    // Below the re-route level: assignment stays.
    let e = d.engine.escalate(&t.id, "customer waiting", 1, "lead").unwrap();
    assert_eq!(e.rerouted_to, None);

    let e = d.engine.escalate(&t.id, "critical lab down", 2, "lead").unwrap();
    assert_eq!(e.from_level, 1);
    assert_eq!(e.rerouted_to.as_deref(), Some("z-lead"));
    assert_eq!(e.ticket.assigned_to.as_deref(), Some("z-lead"));
    assert_eq!(d.count("s1"), 0);
    assert_eq!(d.count("z-lead"), 1);

    // Level must rise.
    assert!(d.engine.escalate(&t.id, "again", 2, "lead").unwrap_err().is_invalid_state());
    assert!(d.engine.escalate(&t.id, "lower", 1, "lead").unwrap_err().is_invalid_state());
    d.assert_counts_consistent();
}

#[test]
fn escalation_keeps_assignee_without_free_senior() {
    let d = desk();
    d.staff("s1", Category::Technical, StaffLevel::Mid, 2);
    d.policy(1);
    let t = d.engine.create(technical("Analyzer offline")).unwrap();

    let e = d.engine.escalate(&t.id, "no seniors", 3, "lead").unwrap();
    assert_eq!(e.rerouted_to, None);
    assert_eq!(e.ticket.assigned_to.as_deref(), Some("s1"));
    assert_eq!(e.ticket.escalation_level, 3);
    assert_eq!(d.count("s1"), 1);
}

#[test]
fn escalation_levels_never_decrease() {
    let d = desk();
    d.staff("s1", Category::Technical, StaffLevel::Mid, 2);
    d.policy(1);
    let now = Utc::now();
    let t = d
        .engine
        .create_at(technical("Analyzer offline"), now - Duration::hours(3))
        .unwrap();
    d.engine.escalate(&t.id, "manual", 4, "lead").unwrap();

    // Breach found, but the level is already above the policy's.
    let report = d.engine.sweep_at(now).unwrap();
    assert_eq!(report.escalated, 0);
    assert_eq!(d.engine.get_ticket(&t.id).unwrap().escalation_level, 4);
}

#[test]
fn reconcile_reports_nothing_after_normal_operation() {
    let d = desk();
    d.staff("s1", Category::Technical, StaffLevel::Mid, 3);
    d.policy(1);
    let a = d.engine.create(technical("A")).unwrap();
    d.engine.create(technical("B")).unwrap();
    d.engine.resolve(&a.id, "", "s1").unwrap();
    d.engine.close(&a.id, false, "s1").unwrap();
    assert!(d.engine.reconcile("t1").unwrap().is_empty());
}
