//! Core types for the support desk engine.
//!
//! Domain model only: tickets, messages, staff, SLA policies and analytics
//! snapshots, plus ID generation and validation. No I/O.

pub mod analytics;
pub mod duration;
pub mod enums;
pub mod filter;
pub mod idgen;
pub mod message;
pub mod sla;
pub mod staff;
pub mod ticket;
pub mod validation;

pub use analytics::AnalyticsSnapshot;
pub use enums::{
    BreachKind, Category, EventType, MessageType, ParseEnumError, Priority, StaffLevel,
    TicketStatus,
};
pub use filter::TicketFilter;
pub use message::{EscalationRecord, Event, Message, NewMessage};
pub use sla::SlaPolicy;
pub use staff::{StaffMember, Tenant, WorkingHours};
pub use ticket::{Ticket, TicketDraft};
pub use validation::ValidationError;
