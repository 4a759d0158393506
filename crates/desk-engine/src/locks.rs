//! Striped per-ticket locks.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, MutexGuard};

const STRIPES: usize = 64;

/// Serializes read-validate-write sequences on the same ticket within this
/// process. Two tickets may share a stripe; that only costs parallelism.
#[derive(Debug)]
pub(crate) struct TicketLocks {
    stripes: Vec<Mutex<()>>,
}

impl TicketLocks {
    pub(crate) fn new() -> Self {
        Self {
            stripes: (0..STRIPES).map(|_| Mutex::new(())).collect(),
        }
    }

    pub(crate) fn lock(&self, ticket_id: &str) -> MutexGuard<'_, ()> {
        let mut hasher = DefaultHasher::new();
        ticket_id.hash(&mut hasher);
        let idx = (hasher.finish() % STRIPES as u64) as usize;
        // A panic while holding the guard leaves no partial state behind:
        // the store transaction it guarded was rolled back.
        self.stripes[idx].lock().unwrap_or_else(|e| e.into_inner())
    }
}
