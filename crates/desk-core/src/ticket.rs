//! Ticket struct -- the central domain model of the support desk.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{Category, Priority, TicketStatus};

/// Helper for `skip_serializing_if` on `bool` fields.
fn is_false(b: &bool) -> bool {
    !b
}

/// Helper for `skip_serializing_if` on `Vec` fields.
fn is_empty_vec<T>(v: &Vec<T>) -> bool {
    v.is_empty()
}

fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}

/// A unit of support work tracked through a fixed lifecycle.
///
/// Tickets are only mutated through the lifecycle operations of the engine;
/// `version` increases by one on every persisted write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    // ===== Identification =====
    pub id: String,

    pub tenant_id: String,

    // ===== Content =====
    pub title: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    // ===== Classification =====
    #[serde(default)]
    pub status: TicketStatus,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub category: Category,

    #[serde(default, skip_serializing_if = "is_empty_vec")]
    pub tags: Vec<String>,

    // ===== People =====
    pub created_by: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reporter_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reporter_email: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reporter_phone: String,

    // ===== Timestamps & SLA deadlines =====
    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_response_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_response_due_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_resolution_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_resolution_time: Option<DateTime<Utc>>,

    // ===== Escalation =====
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub escalation_level: u32,

    #[serde(default, skip_serializing_if = "is_false")]
    pub is_escalated: bool,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub escalation_reason: String,

    // ===== Outcome =====
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub satisfaction_rating: Option<u8>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub satisfaction_feedback: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resolution_notes: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub internal_notes: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cancel_reason: String,

    // ===== Concurrency =====
    #[serde(default)]
    pub version: i64,
}

impl Ticket {
    /// Returns `true` once the ticket is closed or cancelled.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Time elapsed since creation, as seen at `now`.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.created_at
    }

    /// Hours from creation to the first support response, if any.
    pub fn response_time_hours(&self) -> Option<f64> {
        self.first_response_time
            .map(|t| hours_between(self.created_at, t))
    }

    /// Hours from creation to resolution: the close time once closed,
    /// otherwise the time it was marked resolved. Cancelled tickets have none.
    pub fn resolution_time_hours(&self) -> Option<f64> {
        if self.status == TicketStatus::Cancelled {
            return None;
        }
        self.actual_resolution_time
            .or(self.resolved_at)
            .map(|t| hours_between(self.created_at, t))
    }
}

/// Fractional hours between two instants.
pub fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 3_600_000.0
}

/// Caller-supplied fields for a new ticket.
///
/// Built with a fluent API and turned into a [`Ticket`] by the lifecycle
/// manager once validated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketDraft {
    pub tenant_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub category: Category,
    pub created_by: String,
    #[serde(default)]
    pub reporter_name: String,
    #[serde(default)]
    pub reporter_email: String,
    #[serde(default)]
    pub reporter_phone: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl TicketDraft {
    /// Creates a draft with the three required fields.
    pub fn new(
        tenant_id: impl Into<String>,
        title: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            title: title.into(),
            created_by: created_by.into(),
            ..Self::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn reporter(
        mut self,
        name: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        self.reporter_name = name.into();
        self.reporter_email = email.into();
        self.reporter_phone = phone.into();
        self
    }

    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Consumes the draft and returns an open, unassigned [`Ticket`].
    ///
    /// Tags are trimmed, de-duplicated and sorted so the stored tag set is
    /// canonical.
    pub fn into_ticket(self, id: impl Into<String>, now: DateTime<Utc>) -> Ticket {
        let mut tags: Vec<String> = self
            .tags
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        tags.sort();
        tags.dedup();

        Ticket {
            id: id.into(),
            tenant_id: self.tenant_id,
            title: self.title,
            description: self.description,
            status: TicketStatus::Open,
            priority: self.priority,
            category: self.category,
            tags,
            created_by: self.created_by,
            assigned_to: None,
            reporter_name: self.reporter_name,
            reporter_email: self.reporter_email,
            reporter_phone: self.reporter_phone,
            created_at: now,
            updated_at: now,
            first_response_time: None,
            first_response_due_at: None,
            estimated_resolution_time: None,
            resolved_at: None,
            actual_resolution_time: None,
            escalation_level: 0,
            is_escalated: false,
            escalation_reason: String::new(),
            satisfaction_rating: None,
            satisfaction_feedback: String::new(),
            resolution_notes: String::new(),
            internal_notes: String::new(),
            cancel_reason: String::new(),
            version: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> TicketDraft {
        TicketDraft::new("t1", "Analyzer offline", "alice")
            .priority(Priority::High)
            .category(Category::Technical)
    }

    #[test]
    fn draft_into_ticket_starts_open() {
        let now = Utc::now();
        let ticket = draft().into_ticket("tk-abc", now);

        assert_eq!(ticket.id, "tk-abc");
        assert_eq!(ticket.status, TicketStatus::Open);
        assert_eq!(ticket.escalation_level, 0);
        assert!(ticket.assigned_to.is_none());
        assert_eq!(ticket.created_at, now);
        assert_eq!(ticket.version, 0);
    }

    #[test]
    fn tags_are_canonicalized() {
        let ticket = draft()
            .tags(vec!["lis".into(), " urgent ".into(), "lis".into(), "".into()])
            .into_ticket("tk-1", Utc::now());
        assert_eq!(ticket.tags, vec!["lis", "urgent"]);
    }

    #[test]
    fn derived_hours() {
        let now = Utc::now();
        let mut ticket = draft().into_ticket("tk-1", now);
        assert!(ticket.response_time_hours().is_none());

        ticket.first_response_time = Some(now + Duration::minutes(90));
        ticket.actual_resolution_time = Some(now + Duration::hours(6));
        assert_eq!(ticket.response_time_hours(), Some(1.5));
        assert_eq!(ticket.resolution_time_hours(), Some(6.0));
    }

    #[test]
    fn resolution_hours_fall_back_to_resolved_at() {
        let now = Utc::now();
        let mut ticket = draft().into_ticket("tk-1", now);
        assert!(ticket.resolution_time_hours().is_none());

        ticket.status = TicketStatus::Resolved;
        ticket.resolved_at = Some(now + Duration::hours(2));
        assert_eq!(ticket.resolution_time_hours(), Some(2.0));

        ticket.status = TicketStatus::Cancelled;
        assert!(ticket.resolution_time_hours().is_none());
    }

    #[test]
    fn ticket_serde_roundtrip_skips_empty_fields() {
        let ticket = draft().into_ticket("tk-1", Utc::now());
        let json = serde_json::to_string(&ticket).unwrap();
        assert!(!json.contains("assigned_to"));
        assert!(!json.contains("escalation_level"));

        let back: Ticket = serde_json::from_str(&json).unwrap();
        assert_eq!(back.title, "Analyzer offline");
        assert_eq!(back.category, Category::Technical);
    }
}
