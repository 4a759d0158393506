//! Support staff and tenant types.

use serde::{Deserialize, Serialize};

use crate::enums::{Category, StaffLevel};

fn default_true() -> bool {
    true
}

fn default_capacity() -> u32 {
    5
}

/// A daily working window, `HH:MM` local to the staff member's timezone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHours {
    pub start: String,
    pub end: String,
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self {
            start: "09:00".into(),
            end: "17:00".into(),
        }
    }
}

/// A support staff member as known to the capacity tracker.
///
/// `current_ticket_count` is owned by the store and only moves through
/// reserve/release; `total_resolved`, `avg_resolution_time` and
/// `satisfaction_avg` are performance counters kept by the lifecycle manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: String,
    pub tenant_id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,

    #[serde(default)]
    pub specialization: Category,

    #[serde(default)]
    pub level: StaffLevel,

    #[serde(default = "default_capacity")]
    pub max_concurrent_tickets: u32,

    #[serde(default)]
    pub current_ticket_count: u32,

    #[serde(default = "default_true")]
    pub is_available: bool,

    #[serde(default)]
    pub working_hours: WorkingHours,

    #[serde(default = "default_timezone")]
    pub timezone: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<String>,

    // ===== Performance counters =====
    #[serde(default)]
    pub total_resolved: u32,

    /// Mean hours from creation to close over closed tickets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_resolution_time: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub satisfaction_avg: Option<f64>,
}

fn default_timezone() -> String {
    "UTC".into()
}

impl StaffMember {
    /// Creates an available staff member with default capacity and no load.
    pub fn new(
        id: impl Into<String>,
        tenant_id: impl Into<String>,
        specialization: Category,
        level: StaffLevel,
        max_concurrent_tickets: u32,
    ) -> Self {
        Self {
            id: id.into(),
            tenant_id: tenant_id.into(),
            name: String::new(),
            email: String::new(),
            specialization,
            level,
            max_concurrent_tickets,
            current_ticket_count: 0,
            is_available: true,
            working_hours: WorkingHours::default(),
            timezone: default_timezone(),
            skills: Vec::new(),
            languages: Vec::new(),
            total_resolved: 0,
            avg_resolution_time: None,
            satisfaction_avg: None,
        }
    }

    /// Current load as a percentage of capacity. Zero-capacity staff count as
    /// fully loaded.
    pub fn workload_percentage(&self) -> f64 {
        if self.max_concurrent_tickets == 0 {
            return 100.0;
        }
        f64::from(self.current_ticket_count) * 100.0 / f64::from(self.max_concurrent_tickets)
    }

    pub fn is_overloaded(&self) -> bool {
        self.current_ticket_count >= self.max_concurrent_tickets
    }

    /// Available and under capacity.
    pub fn has_capacity(&self) -> bool {
        self.is_available && !self.is_overloaded()
    }

    /// Staff serve their own specialization; `general` staff serve any category.
    pub fn serves(&self, category: Category) -> bool {
        self.specialization == category || self.specialization == Category::General
    }
}

/// A tenant as reported by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl Tenant {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_active: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workload_and_overload() {
        let mut s = StaffMember::new("s1", "t1", Category::Technical, StaffLevel::Mid, 4);
        assert_eq!(s.workload_percentage(), 0.0);
        assert!(s.has_capacity());

        s.current_ticket_count = 1;
        assert_eq!(s.workload_percentage(), 25.0);

        s.current_ticket_count = 4;
        assert!(s.is_overloaded());
        assert!(!s.has_capacity());
    }

    #[test]
    fn zero_capacity_is_overloaded() {
        let s = StaffMember::new("s1", "t1", Category::Technical, StaffLevel::Mid, 0);
        assert!(s.is_overloaded());
        assert_eq!(s.workload_percentage(), 100.0);
    }

    #[test]
    fn general_serves_everything() {
        let g = StaffMember::new("s1", "t1", Category::General, StaffLevel::Mid, 1);
        let b = StaffMember::new("s2", "t1", Category::Billing, StaffLevel::Mid, 1);
        assert!(g.serves(Category::Equipment));
        assert!(b.serves(Category::Billing));
        assert!(!b.serves(Category::Technical));
    }

    #[test]
    fn staff_yaml_defaults() {
        let yaml = "id: s1\ntenant_id: t1\nspecialization: technical\nlevel: senior\n";
        let s: StaffMember = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(s.max_concurrent_tickets, 5);
        assert!(s.is_available);
        assert_eq!(s.level, StaffLevel::Senior);
        assert_eq!(s.timezone, "UTC");
        assert_eq!(s.working_hours.start, "09:00");
    }
}
