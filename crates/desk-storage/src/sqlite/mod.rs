//! SQLite-backed storage implementation.

mod events;
mod policies;
pub mod schema;
mod snapshots;
mod staff;
mod store;
mod tickets;
mod transaction;

pub use store::SqliteStore;
