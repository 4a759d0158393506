//! Outbound notifications.
//!
//! Lifecycle operations emit an [`OutboundEvent`] after their transaction
//! commits. Delivery is best effort: a failing [`Notifier`] is logged and
//! never fails the operation that produced the event.

use std::sync::mpsc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Errors raised by a notification transport.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification channel closed")]
    Closed,

    #[error("failed to encode notification: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("delivery failed: {0}")]
    Transport(String),
}

/// Transport for outbound ticket events.
pub trait Notifier: Send + Sync {
    /// Delivers a JSON `payload` to `recipient`.
    fn deliver(&self, recipient: &str, payload: &str) -> Result<(), NotifyError>;
}

/// A ticket-state change announced to the outside world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundEvent {
    /// Dotted event name, e.g. `ticket.assigned`.
    pub name: String,
    pub ticket_id: String,
    pub tenant_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl OutboundEvent {
    pub fn new(
        name: impl Into<String>,
        ticket_id: impl Into<String>,
        tenant_id: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            ticket_id: ticket_id.into(),
            tenant_id: tenant_id.into(),
            timestamp,
            detail: None,
        }
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn to_payload(&self) -> Result<String, NotifyError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Writes every event to the log at `info`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn deliver(&self, recipient: &str, payload: &str) -> Result<(), NotifyError> {
        info!(recipient, payload, "notification");
        Ok(())
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn deliver(&self, _recipient: &str, _payload: &str) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// One queued delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub recipient: String,
    pub payload: String,
}

impl Delivery {
    /// Decodes the payload back into the event.
    pub fn event(&self) -> Result<OutboundEvent, NotifyError> {
        Ok(serde_json::from_str(&self.payload)?)
    }
}

/// Queues deliveries on an mpsc channel for a consumer thread.
#[derive(Debug)]
pub struct ChannelNotifier {
    tx: mpsc::Sender<Delivery>,
}

impl ChannelNotifier {
    /// Returns the notifier and the receiving end of its queue.
    pub fn new() -> (Self, mpsc::Receiver<Delivery>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn deliver(&self, recipient: &str, payload: &str) -> Result<(), NotifyError> {
        self.tx
            .send(Delivery {
                recipient: recipient.to_string(),
                payload: payload.to_string(),
            })
            .map_err(|_| NotifyError::Closed)
    }
}
