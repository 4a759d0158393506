//! Routing allocator: least-loaded eligible staff with reservation retry.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use desk_core::staff::StaffMember;

use crate::engine::{Engine, SYSTEM_ACTOR};
use crate::error::{EngineError, Result};
use crate::resolver::PolicyCache;

impl Engine {
    /// Assigns an open, unassigned ticket to the best available staff member.
    ///
    /// Returns `None` without error when the ticket is already assigned or
    /// terminal, has no SLA policy, or nobody eligible has free capacity.
    pub fn route(&self, ticket_id: &str) -> Result<Option<StaffMember>> {
        let mut cache = PolicyCache::new(self.store());
        self.route_with(ticket_id, &mut cache, Utc::now())
    }

    pub(crate) fn route_with(
        &self,
        ticket_id: &str,
        cache: &mut PolicyCache<'_>,
        now: DateTime<Utc>,
    ) -> Result<Option<StaffMember>> {
        let ticket = self.store.get_ticket(ticket_id)?;
        if ticket.is_terminal() || ticket.assigned_to.is_some() {
            return Ok(None);
        }

        if cache
            .lookup(&ticket.tenant_id, ticket.priority, ticket.category)?
            .is_none()
        {
            debug!(id = ticket_id, "no SLA policy; not routing");
            return Ok(None);
        }

        // Tickets already escalated past the re-route level only go to seniors.
        let candidates = if ticket.escalation_level >= self.settings.reassign_from_level {
            self.capacity
                .senior_candidates(&ticket.tenant_id, ticket.category)?
        } else {
            self.capacity.candidates(&ticket.tenant_id, ticket.category)?
        };

        for candidate in candidates {
            match self.assign_at(ticket_id, &candidate.id, SYSTEM_ACTOR, true, now) {
                Ok(_) => {
                    info!(id = ticket_id, staff_id = %candidate.id, "ticket routed");
                    return Ok(Some(self.store.get_staff(&candidate.id)?));
                }
                Err(EngineError::CapacityExhausted { staff_id }) => {
                    warn!(id = ticket_id, staff_id, "lost reservation race, trying next candidate");
                }
                Err(EngineError::AssignmentConflict { reason, .. }) => {
                    debug!(id = ticket_id, reason, "ticket no longer routable");
                    return Ok(None);
                }
                Err(e) => return Err(e),
            }
        }

        debug!(id = ticket_id, "no staff with free capacity");
        Ok(None)
    }
}
