//! Ticket lifecycle operations.
//!
//! ```text
//! open -> pending -> in_progress -> resolved -> closed
//!   \________\___________\______________\-----> cancelled
//! ```
//!
//! Every mutation follows the same shape: take the ticket's stripe lock,
//! read and validate, then write the new row, its audit events and any
//! capacity moves in one store transaction guarded by the row version.
//! Notifications go out after the commit.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use desk_core::enums::{BreachKind, EventType, MessageType, TicketStatus};
use desk_core::filter::TicketFilter;
use desk_core::idgen::{MAX_ID_ATTEMPTS, generate_ticket_id};
use desk_core::message::{EscalationRecord, Event, Message, NewMessage};
use desk_core::ticket::{Ticket, TicketDraft, hours_between};
use desk_core::validation::{validate_draft, validate_message, validate_rating};
use desk_storage::{StorageError, Transaction};

use crate::engine::{Engine, SYSTEM_ACTOR};
use crate::error::{EngineError, Result};
use crate::notify::OutboundEvent;
use crate::resolver::PolicyCache;

/// Result of an escalation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Escalation {
    pub ticket: Ticket,
    pub from_level: u32,
    /// Senior staff member the ticket moved to, if it was re-routed.
    pub rerouted_to: Option<String>,
}

/// Writes `after` over `before`, bumping the version and `updated_at`.
fn save(tx: &dyn Transaction, before: &Ticket, after: &mut Ticket, now: DateTime<Utc>) -> Result<()> {
    after.updated_at = now;
    after.version = before.version + 1;
    tx.update_ticket(after, before.version)?;
    Ok(())
}

fn status_event(
    tx: &dyn Transaction,
    ticket: &Ticket,
    from: TicketStatus,
    actor: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    if from != ticket.status {
        tx.emit_event(
            ticket,
            EventType::StatusChanged,
            actor,
            Some(from.as_str()),
            Some(ticket.status.as_str()),
            None,
            now,
        )?;
    }
    Ok(())
}

impl Engine {
    // -- Creation --------------------------------------------------------------

    /// Creates a ticket and routes it.
    ///
    /// The ticket gets SLA deadlines when a policy resolves. Creation
    /// succeeds even when no policy or no staff capacity is available; the
    /// ticket then stays open and unassigned until a sweep routes it.
    pub fn create(&self, draft: TicketDraft) -> Result<Ticket> {
        self.create_at(draft, Utc::now())
    }

    /// [`create`](Self::create) with an explicit creation instant.
    pub fn create_at(&self, draft: TicketDraft, now: DateTime<Utc>) -> Result<Ticket> {
        validate_draft(&draft)?;
        self.require_tenant(&draft.tenant_id)?;

        let mut cache = PolicyCache::new(self.store());
        let policy = cache.lookup(&draft.tenant_id, draft.priority, draft.category)?;
        if policy.is_none() {
            debug!(tenant_id = %draft.tenant_id, priority = %draft.priority, category = %draft.category,
                "no SLA policy; ticket has no deadlines");
        }

        let mut created = None;
        for nonce in 0..MAX_ID_ATTEMPTS {
            let id = generate_ticket_id(
                &self.settings.ticket_prefix,
                &draft.tenant_id,
                &draft.title,
                &draft.created_by,
                now,
                nonce,
            );
            let mut ticket = draft.clone().into_ticket(id, now);
            if let Some(policy) = &policy {
                ticket.first_response_due_at = policy.first_response_deadline(now);
                ticket.estimated_resolution_time = policy.resolution_deadline(now);
            }
            match self.store.create_ticket(&ticket, &draft.created_by) {
                Ok(()) => {
                    created = Some(ticket);
                    break;
                }
                Err(e) if e.is_already_exists() => {
                    debug!(id = %ticket.id, nonce, "ticket id collision, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        let ticket = created.ok_or_else(|| {
            EngineError::Storage(StorageError::Transaction(format!(
                "no unique ticket id after {MAX_ID_ATTEMPTS} attempts"
            )))
        })?;
        info!(id = %ticket.id, tenant_id = %ticket.tenant_id, priority = %ticket.priority, "ticket created");

        self.notify(
            &ticket.created_by,
            OutboundEvent::new("ticket.created", &ticket.id, &ticket.tenant_id, now),
        );

        match self.route_with(&ticket.id, &mut cache, now) {
            Ok(Some(staff)) => debug!(id = %ticket.id, staff_id = %staff.id, "routed on creation"),
            Ok(None) => info!(id = %ticket.id, "ticket left unassigned"),
            Err(e) => warn!(id = %ticket.id, error = %e, "routing failed; ticket left unassigned"),
        }

        Ok(self.store.get_ticket(&ticket.id)?)
    }

    // -- Assignment ------------------------------------------------------------

    /// Assigns a ticket to a staff member of the same tenant.
    ///
    /// Takes one unit of the staff member's capacity and returns the previous
    /// assignee's unit, if any, in the same transaction. An open ticket moves
    /// to pending.
    pub fn assign(&self, ticket_id: &str, staff_id: &str, actor: &str) -> Result<Ticket> {
        self.assign_at(ticket_id, staff_id, actor, false, Utc::now())
    }

    /// With `only_if_unassigned`, an already assigned ticket is an
    /// [`EngineError::AssignmentConflict`] (the router never steals work).
    pub(crate) fn assign_at(
        &self,
        ticket_id: &str,
        staff_id: &str,
        actor: &str,
        only_if_unassigned: bool,
        now: DateTime<Utc>,
    ) -> Result<Ticket> {
        let _guard = self.locks.lock(ticket_id);
        let ticket = self.store.get_ticket(ticket_id)?;

        if ticket.is_terminal() {
            return Err(EngineError::AssignmentConflict {
                id: ticket_id.to_string(),
                reason: format!("ticket is {}", ticket.status),
            });
        }
        if let Some(current) = &ticket.assigned_to {
            if only_if_unassigned {
                return Err(EngineError::AssignmentConflict {
                    id: ticket_id.to_string(),
                    reason: format!("already assigned to {current}"),
                });
            }
            if current == staff_id {
                return Ok(ticket);
            }
        }
        self.capacity.staff_in_tenant(staff_id, &ticket.tenant_id)?;

        let updated = self.in_tx(|tx| {
            if !tx.reserve(staff_id)? {
                return Err(EngineError::CapacityExhausted {
                    staff_id: staff_id.to_string(),
                });
            }
            if let Some(previous) = &ticket.assigned_to {
                tx.release(previous)?;
            }

            let mut t = ticket.clone();
            t.assigned_to = Some(staff_id.to_string());
            if t.status == TicketStatus::Open {
                t.status = TicketStatus::Pending;
            }
            save(tx, &ticket, &mut t, now)?;

            tx.emit_event(
                &t,
                EventType::Assigned,
                actor,
                ticket.assigned_to.as_deref(),
                Some(staff_id),
                None,
                now,
            )?;
            status_event(tx, &t, ticket.status, actor, now)?;
            Ok(t)
        })?;

        info!(id = ticket_id, staff_id, "ticket assigned");
        self.notify(
            staff_id,
            OutboundEvent::new("ticket.assigned", ticket_id, &updated.tenant_id, now),
        );
        Ok(updated)
    }

    /// Moves a pending ticket to in_progress.
    pub fn start_work(&self, ticket_id: &str, actor: &str) -> Result<Ticket> {
        let now = Utc::now();
        let _guard = self.locks.lock(ticket_id);
        let ticket = self.store.get_ticket(ticket_id)?;
        if ticket.status != TicketStatus::Pending {
            return Err(EngineError::invalid_state(ticket_id, ticket.status, "start work on"));
        }

        self.in_tx(|tx| {
            let mut t = ticket.clone();
            t.status = TicketStatus::InProgress;
            save(tx, &ticket, &mut t, now)?;
            status_event(tx, &t, ticket.status, actor, now)?;
            Ok(t)
        })
    }

    // -- Conversation ----------------------------------------------------------

    /// Appends a message.
    ///
    /// The first non-internal message whose sender is a staff member of the
    /// ticket's tenant records the first response time. Later messages
    /// never move it.
    pub fn add_message(&self, ticket_id: &str, message: NewMessage) -> Result<Message> {
        self.add_message_at(ticket_id, message, Utc::now())
    }

    pub fn add_message_at(
        &self,
        ticket_id: &str,
        message: NewMessage,
        now: DateTime<Utc>,
    ) -> Result<Message> {
        validate_message(&message.sender, &message.body)?;

        let _guard = self.locks.lock(ticket_id);
        let ticket = self.store.get_ticket(ticket_id)?;
        if ticket.is_terminal() {
            return Err(EngineError::invalid_state(ticket_id, ticket.status, "add a message to"));
        }

        let from_staff = match self.capacity.staff_in_tenant(&message.sender, &ticket.tenant_id) {
            Ok(_) => true,
            Err(e) if e.is_not_found() => false,
            Err(e) => return Err(e),
        };
        let counts_as_response = from_staff && !message.is_internal;

        let (stored, first_response) = self.in_tx(|tx| {
            let stored = tx.add_message(ticket_id, &message, now)?;
            tx.emit_event(
                &ticket,
                EventType::Messaged,
                &message.sender,
                None,
                None,
                message.is_internal.then_some("internal"),
                now,
            )?;
            let first = counts_as_response && tx.set_first_response_if_null(ticket_id, now)?;
            if first {
                tx.emit_event(
                    &ticket,
                    EventType::FirstResponse,
                    &message.sender,
                    None,
                    Some(now.to_rfc3339().as_str()),
                    None,
                    now,
                )?;
            }
            Ok((stored, first))
        })?;

        if first_response {
            info!(id = ticket_id, sender = %message.sender, "first response recorded");
        }
        Ok(stored)
    }

    // -- Resolution ------------------------------------------------------------

    /// Marks a pending or in-progress ticket resolved.
    pub fn resolve(&self, ticket_id: &str, notes: &str, actor: &str) -> Result<Ticket> {
        let now = Utc::now();
        let _guard = self.locks.lock(ticket_id);
        let ticket = self.store.get_ticket(ticket_id)?;
        if !matches!(ticket.status, TicketStatus::Pending | TicketStatus::InProgress) {
            return Err(EngineError::invalid_state(ticket_id, ticket.status, "resolve"));
        }

        let updated = self.in_tx(|tx| {
            let mut t = ticket.clone();
            t.status = TicketStatus::Resolved;
            t.resolved_at = Some(now);
            t.resolution_notes = notes.to_string();
            save(tx, &ticket, &mut t, now)?;
            tx.emit_event(
                &t,
                EventType::Resolved,
                actor,
                Some(ticket.status.as_str()),
                Some(t.status.as_str()),
                (!notes.is_empty()).then_some(notes),
                now,
            )?;
            Ok(t)
        })?;

        info!(id = ticket_id, "ticket resolved");
        self.notify(
            &updated.created_by,
            OutboundEvent::new("ticket.resolved", ticket_id, &updated.tenant_id, now),
        );
        Ok(updated)
    }

    /// Closes a resolved ticket, or any non-terminal ticket with `force`.
    ///
    /// Records the final resolution time, returns the assignee's capacity
    /// unit and updates their performance counters.
    pub fn close(&self, ticket_id: &str, force: bool, actor: &str) -> Result<Ticket> {
        self.close_at(ticket_id, force, actor, Utc::now())
    }

    pub fn close_at(
        &self,
        ticket_id: &str,
        force: bool,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<Ticket> {
        let _guard = self.locks.lock(ticket_id);
        let ticket = self.store.get_ticket(ticket_id)?;
        if ticket.is_terminal() || (ticket.status != TicketStatus::Resolved && !force) {
            return Err(EngineError::invalid_state(ticket_id, ticket.status, "close"));
        }

        let updated = self.in_tx(|tx| {
            let mut t = ticket.clone();
            t.status = TicketStatus::Closed;
            t.actual_resolution_time = Some(now);
            save(tx, &ticket, &mut t, now)?;

            if let Some(staff_id) = &t.assigned_to {
                tx.release(staff_id)?;
                tx.record_resolution(staff_id, hours_between(t.created_at, now))?;
            }
            tx.emit_event(
                &t,
                EventType::Closed,
                actor,
                Some(ticket.status.as_str()),
                Some(t.status.as_str()),
                force.then_some("forced"),
                now,
            )?;
            Ok(t)
        })?;

        info!(id = ticket_id, force, "ticket closed");
        self.notify(
            &updated.created_by,
            OutboundEvent::new("ticket.closed", ticket_id, &updated.tenant_id, now),
        );
        Ok(updated)
    }

    /// Cancels a non-terminal ticket and frees its assignee's capacity.
    pub fn cancel(&self, ticket_id: &str, reason: &str, actor: &str) -> Result<Ticket> {
        let now = Utc::now();
        let _guard = self.locks.lock(ticket_id);
        let ticket = self.store.get_ticket(ticket_id)?;
        if ticket.is_terminal() {
            return Err(EngineError::invalid_state(ticket_id, ticket.status, "cancel"));
        }

        let updated = self.in_tx(|tx| {
            let mut t = ticket.clone();
            t.status = TicketStatus::Cancelled;
            t.cancel_reason = reason.to_string();
            save(tx, &ticket, &mut t, now)?;
            if let Some(staff_id) = &t.assigned_to {
                tx.release(staff_id)?;
            }
            tx.emit_event(
                &t,
                EventType::Cancelled,
                actor,
                Some(ticket.status.as_str()),
                Some(t.status.as_str()),
                (!reason.is_empty()).then_some(reason),
                now,
            )?;
            Ok(t)
        })?;

        info!(id = ticket_id, "ticket cancelled");
        self.notify(
            &updated.created_by,
            OutboundEvent::new("ticket.cancelled", ticket_id, &updated.tenant_id, now),
        );
        Ok(updated)
    }

    /// Records a 1-5 satisfaction rating on a resolved or closed ticket.
    pub fn rate_satisfaction(
        &self,
        ticket_id: &str,
        rating: u8,
        feedback: &str,
        actor: &str,
    ) -> Result<Ticket> {
        validate_rating(rating)?;
        let now = Utc::now();
        let _guard = self.locks.lock(ticket_id);
        let ticket = self.store.get_ticket(ticket_id)?;
        if !ticket.status.is_finished() {
            return Err(EngineError::invalid_state(ticket_id, ticket.status, "rate"));
        }

        self.in_tx(|tx| {
            let mut t = ticket.clone();
            t.satisfaction_rating = Some(rating);
            t.satisfaction_feedback = feedback.to_string();
            save(tx, &ticket, &mut t, now)?;
            if let Some(staff_id) = &t.assigned_to {
                tx.refresh_satisfaction(staff_id)?;
            }
            let old = ticket.satisfaction_rating.map(|r| r.to_string());
            tx.emit_event(
                &t,
                EventType::Rated,
                actor,
                old.as_deref(),
                Some(rating.to_string().as_str()),
                (!feedback.is_empty()).then_some(feedback),
                now,
            )?;
            Ok(t)
        })
    }

    // -- Escalation ------------------------------------------------------------

    /// Raises a ticket's escalation level by hand.
    ///
    /// At or above the configured re-route level the ticket moves to the
    /// least loaded senior staff member with free capacity; when none is
    /// free the current assignment stays.
    pub fn escalate(
        &self,
        ticket_id: &str,
        reason: &str,
        new_level: u32,
        actor: &str,
    ) -> Result<Escalation> {
        self.escalate_at(ticket_id, reason, new_level, BreachKind::Manual, actor, Utc::now())
    }

    pub(crate) fn escalate_at(
        &self,
        ticket_id: &str,
        reason: &str,
        new_level: u32,
        kind: BreachKind,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<Escalation> {
        let _guard = self.locks.lock(ticket_id);
        let ticket = self.store.get_ticket(ticket_id)?;
        if ticket.is_terminal() {
            return Err(EngineError::invalid_state(ticket_id, ticket.status, "escalate"));
        }
        if new_level <= ticket.escalation_level {
            return Err(EngineError::InvalidState {
                id: ticket_id.to_string(),
                reason: format!(
                    "escalation level {new_level} does not exceed current level {}",
                    ticket.escalation_level
                ),
            });
        }

        // Senior staff already on the ticket keep it.
        let current_is_senior = match &ticket.assigned_to {
            Some(staff_id) => match self.store.get_staff(staff_id) {
                Ok(staff) => self.capacity.is_senior(staff.level),
                Err(e) if e.is_not_found() => false,
                Err(e) => return Err(e.into()),
            },
            None => false,
        };
        let seniors = if new_level >= self.settings.reassign_from_level && !current_is_senior {
            self.capacity
                .senior_candidates(&ticket.tenant_id, ticket.category)?
        } else {
            Vec::new()
        };

        let from_level = ticket.escalation_level;
        let (updated, rerouted_to) = self.in_tx(|tx| {
            let mut t = ticket.clone();
            t.escalation_level = new_level;
            t.is_escalated = true;
            t.escalation_reason = reason.to_string();

            let mut moved_to = None;
            for candidate in &seniors {
                if tx.reserve(&candidate.id)? {
                    if let Some(previous) = &ticket.assigned_to {
                        tx.release(previous)?;
                    }
                    t.assigned_to = Some(candidate.id.clone());
                    if t.status == TicketStatus::Open {
                        t.status = TicketStatus::Pending;
                    }
                    moved_to = Some(candidate.id.clone());
                    break;
                }
            }
            save(tx, &ticket, &mut t, now)?;

            tx.add_escalation(ticket_id, from_level, new_level, reason, kind, now)?;
            tx.add_message(
                ticket_id,
                &NewMessage::new(SYSTEM_ACTOR, format!("Escalated to level {new_level}: {reason}"))
                    .internal(true)
                    .message_type(MessageType::Escalation),
                now,
            )?;
            tx.emit_event(
                &t,
                EventType::Escalated,
                actor,
                Some(from_level.to_string().as_str()),
                Some(new_level.to_string().as_str()),
                Some(reason),
                now,
            )?;
            if let Some(staff_id) = &moved_to {
                tx.emit_event(
                    &t,
                    EventType::Assigned,
                    actor,
                    ticket.assigned_to.as_deref(),
                    Some(staff_id),
                    Some("escalation re-route"),
                    now,
                )?;
                status_event(tx, &t, ticket.status, actor, now)?;
            }
            Ok((t, moved_to))
        })?;

        info!(id = ticket_id, from_level, new_level, %kind, rerouted_to = ?rerouted_to, "ticket escalated");
        if let Some(staff_id) = &updated.assigned_to {
            self.notify(
                staff_id,
                OutboundEvent::new("ticket.escalated", ticket_id, &updated.tenant_id, now)
                    .detail(reason),
            );
        }
        if let Some(staff_id) = &rerouted_to {
            self.notify(
                staff_id,
                OutboundEvent::new("ticket.assigned", ticket_id, &updated.tenant_id, now),
            );
        }

        Ok(Escalation {
            ticket: updated,
            from_level,
            rerouted_to,
        })
    }

    // -- Reads -----------------------------------------------------------------

    pub fn get_ticket(&self, ticket_id: &str) -> Result<Ticket> {
        Ok(self.store.get_ticket(ticket_id)?)
    }

    pub fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>> {
        Ok(self.store.list_tickets(filter)?)
    }

    pub fn get_messages(&self, ticket_id: &str) -> Result<Vec<Message>> {
        self.store.get_ticket(ticket_id)?;
        Ok(self.store.get_messages(ticket_id)?)
    }

    /// Audit events, newest first; `limit` 0 returns all.
    pub fn get_events(&self, ticket_id: &str, limit: u32) -> Result<Vec<Event>> {
        self.store.get_ticket(ticket_id)?;
        Ok(self.store.get_events(ticket_id, limit)?)
    }

    pub fn get_escalations(&self, ticket_id: &str) -> Result<Vec<EscalationRecord>> {
        self.store.get_ticket(ticket_id)?;
        Ok(self.store.get_escalations(ticket_id)?)
    }
}
