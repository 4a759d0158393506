//! SLA policy type.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::duration::duration_secs;
use crate::enums::{Category, Priority};

fn default_true() -> bool {
    true
}

/// Response/resolution/escalation targets for a (tenant, priority, category).
///
/// A `None` category is the wildcard fallback for its (tenant, priority).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlaPolicy {
    #[serde(default)]
    pub id: i64,

    pub tenant_id: String,

    #[serde(default)]
    pub name: String,

    pub priority: Priority,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,

    #[serde(with = "duration_secs")]
    pub first_response_target: Duration,

    #[serde(with = "duration_secs")]
    pub resolution_target: Duration,

    #[serde(with = "duration_secs")]
    pub escalation_time: Duration,

    pub escalation_level: u32,

    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl SlaPolicy {
    pub fn new(
        tenant_id: impl Into<String>,
        priority: Priority,
        category: Option<Category>,
        first_response_target: Duration,
        resolution_target: Duration,
        escalation_level: u32,
    ) -> Self {
        Self {
            id: 0,
            tenant_id: tenant_id.into(),
            name: String::new(),
            priority,
            category,
            first_response_target,
            resolution_target,
            escalation_time: first_response_target,
            escalation_level,
            is_active: true,
        }
    }

    /// Cache/lookup key for this policy.
    pub fn key(&self) -> (String, Priority, Option<Category>) {
        (self.tenant_id.clone(), self.priority, self.category)
    }

    /// `None` when the deadline falls outside the representable range.
    pub fn first_response_deadline(&self, created_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        created_at.checked_add_signed(self.first_response_target)
    }

    pub fn resolution_deadline(&self, created_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        created_at.checked_add_signed(self.resolution_target)
    }
}
