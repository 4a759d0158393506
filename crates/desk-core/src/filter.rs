//! Filter type for querying tickets.

use crate::enums::{Category, Priority, TicketStatus};

/// Filter for ticket queries. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    pub tenant_id: Option<String>,
    pub status: Option<TicketStatus>,
    pub priority: Option<Priority>,
    pub category: Option<Category>,
    pub assigned_to: Option<String>,
    pub created_by: Option<String>,

    /// Only tickets without an assignee.
    pub unassigned: bool,

    /// Only non-terminal tickets (open, pending, in_progress, resolved).
    pub non_terminal: bool,

    /// Case-insensitive substring match over title and description.
    pub search: Option<String>,

    pub limit: Option<u32>,
}

impl TicketFilter {
    /// Filter scoped to one tenant.
    pub fn for_tenant(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: Some(tenant_id.into()),
            ..Self::default()
        }
    }
}
