//! Command handlers, one module per command (or command family).

pub mod assign;
pub mod create;
pub mod escalate;
pub mod history;
pub mod init;
pub mod list;
pub mod message;
pub mod rate;
pub mod serve;
pub mod show;
pub mod sla;
pub mod snapshot;
pub mod staff;
pub mod sweep;
pub mod transition;
