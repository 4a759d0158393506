//! Ticket routing and SLA engine for the support desk.
//!
//! [`Engine`] ties the components together over a [`desk_storage::Storage`]:
//!
//! - SLA policy resolution ([`resolver`])
//! - staff capacity tracking ([`capacity`])
//! - the ticket lifecycle ([`lifecycle`])
//! - routing ([`router`])
//! - the escalation monitor ([`escalation`])
//! - daily analytics ([`analytics`])
//!
//! Identity data comes from a [`Directory`]; outbound events leave through a
//! [`Notifier`]. [`Scheduler`] runs the periodic sweep and rollup.

pub mod analytics;
pub mod capacity;
pub mod directory;
pub mod engine;
pub mod error;
pub mod escalation;
pub mod lifecycle;
mod locks;
pub mod notify;
pub mod resolver;
pub mod router;
pub mod scheduler;

pub use capacity::{CapacityTracker, CountCorrection, SyncReport};
pub use directory::{Directory, DirectoryError, DirectoryFile, InMemoryDirectory, YamlDirectory};
pub use engine::{Engine, EngineSettings, SYSTEM_ACTOR};
pub use error::{EngineError, Result};
pub use escalation::SweepReport;
pub use lifecycle::Escalation;
pub use notify::{
    ChannelNotifier, Delivery, LogNotifier, Notifier, NotifyError, NullNotifier, OutboundEvent,
};
pub use resolver::{PolicyCache, resolve_policy};
pub use scheduler::{ScheduleConfig, Scheduler};

#[cfg(test)]
mod tests;
