//! Message, Event and EscalationRecord types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{BreachKind, EventType, MessageType};

fn is_false(b: &bool) -> bool {
    !b
}

/// A message appended to a ticket's conversation.
///
/// Messages are append-only; `id` is assigned by the store and gives a total
/// order per ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub ticket_id: String,
    pub sender: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_internal: bool,
    #[serde(default)]
    pub message_type: MessageType,
    pub created_at: DateTime<Utc>,
}

/// A new message before the store assigns its id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub sender: String,
    pub body: String,
    pub is_internal: bool,
    pub message_type: MessageType,
}

impl NewMessage {
    pub fn new(sender: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            body: body.into(),
            is_internal: false,
            message_type: MessageType::User,
        }
    }

    pub fn internal(mut self, is_internal: bool) -> Self {
        self.is_internal = is_internal;
        self
    }

    pub fn message_type(mut self, message_type: MessageType) -> Self {
        self.message_type = message_type;
        self
    }
}

/// An audit trail entry recording a change to a ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub ticket_id: String,
    pub tenant_id: String,
    pub event_type: EventType,
    pub actor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One raise of a ticket's escalation level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationRecord {
    pub id: i64,
    pub ticket_id: String,
    pub from_level: u32,
    pub to_level: u32,
    pub reason: String,
    pub kind: BreachKind,
    pub created_at: DateTime<Utc>,
}
