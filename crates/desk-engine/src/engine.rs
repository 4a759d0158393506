//! The [`Engine`]: shared state and plumbing for every lifecycle operation.

use std::cell::RefCell;
use std::sync::Arc;

use tracing::warn;

use desk_core::enums::StaffLevel;
use desk_core::staff::{StaffMember, Tenant};
use desk_storage::{Storage, StorageError, Transaction};

use crate::capacity::{CapacityTracker, CountCorrection, SyncReport};
use crate::directory::Directory;
use crate::error::{EngineError, Result};
use crate::locks::TicketLocks;
use crate::notify::{LogNotifier, Notifier, OutboundEvent};

/// Actor recorded for changes the engine makes on its own (routing, sweeps).
pub const SYSTEM_ACTOR: &str = "system";

/// Tunables the engine reads from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    /// Prefix for generated ticket ids.
    pub ticket_prefix: String,
    /// Escalating to this level or above moves the ticket to the senior pool.
    pub reassign_from_level: u32,
    pub senior_levels: Vec<StaffLevel>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            ticket_prefix: "tk".to_string(),
            reassign_from_level: 2,
            senior_levels: StaffLevel::SENIOR_POOL.to_vec(),
        }
    }
}

/// The ticket routing and SLA engine.
///
/// `Engine` is `Send + Sync`; share it behind an `Arc` between request
/// threads and the background [`Scheduler`](crate::scheduler::Scheduler).
pub struct Engine {
    pub(crate) store: Arc<dyn Storage>,
    pub(crate) directory: Arc<dyn Directory>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) capacity: CapacityTracker,
    pub(crate) settings: EngineSettings,
    pub(crate) locks: TicketLocks,
}

impl Engine {
    /// Creates an engine with default settings and a [`LogNotifier`].
    pub fn new(store: Arc<dyn Storage>, directory: Arc<dyn Directory>) -> Self {
        let settings = EngineSettings::default();
        Self {
            capacity: CapacityTracker::new(store.clone(), settings.senior_levels.clone()),
            store,
            directory,
            notifier: Arc::new(LogNotifier),
            settings,
            locks: TicketLocks::new(),
        }
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.capacity = CapacityTracker::new(self.store.clone(), settings.senior_levels.clone());
        self.settings = settings;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn store(&self) -> &dyn Storage {
        self.store.as_ref()
    }

    pub fn directory(&self) -> &dyn Directory {
        self.directory.as_ref()
    }

    pub fn capacity(&self) -> &CapacityTracker {
        &self.capacity
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    // -- Staff -----------------------------------------------------------------

    /// Pulls the tenant's roster from the directory into the store.
    pub fn sync_staff(&self, tenant_id: &str) -> Result<SyncReport> {
        self.require_tenant(tenant_id)?;
        self.capacity.sync_directory(self.directory.as_ref(), tenant_id)
    }

    /// Repairs capacity counters that drifted from the ticket table.
    pub fn reconcile(&self, tenant_id: &str) -> Result<Vec<CountCorrection>> {
        self.capacity.reconcile(tenant_id)
    }

    pub fn list_staff(&self, tenant_id: &str) -> Result<Vec<StaffMember>> {
        Ok(self.store.list_staff(tenant_id)?)
    }

    /// The tenant, which must exist and be active.
    pub(crate) fn require_tenant(&self, tenant_id: &str) -> Result<Tenant> {
        let tenant = self
            .directory
            .get_tenant(tenant_id)?
            .ok_or_else(|| EngineError::not_found("tenant", tenant_id))?;
        if !tenant.is_active {
            return Err(EngineError::TenantInactive(tenant_id.to_string()));
        }
        Ok(tenant)
    }

    /// Runs `f` in one store transaction and hands back its value.
    ///
    /// Any error from `f`, engine-level or storage-level, rolls the whole
    /// transaction back and is returned unchanged.
    pub(crate) fn in_tx<T>(&self, f: impl Fn(&dyn Transaction) -> Result<T>) -> Result<T> {
        let output: RefCell<Option<T>> = RefCell::new(None);
        let failure: RefCell<Option<EngineError>> = RefCell::new(None);

        let outcome = self.store.run_in_transaction(&|tx| match f(tx) {
            Ok(value) => {
                *output.borrow_mut() = Some(value);
                Ok(())
            }
            Err(e) => {
                *failure.borrow_mut() = Some(e);
                Err(StorageError::Transaction("rolled back".into()))
            }
        });

        if let Some(e) = failure.into_inner() {
            return Err(e);
        }
        outcome?;
        output
            .into_inner()
            .ok_or_else(|| EngineError::Storage(StorageError::Transaction("no result".into())))
    }

    /// Best-effort delivery of an outbound event.
    pub(crate) fn notify(&self, recipient: &str, event: OutboundEvent) {
        let result = event
            .to_payload()
            .and_then(|payload| self.notifier.deliver(recipient, &payload));
        if let Err(e) = result {
            warn!(recipient, event = %event.name, ticket_id = %event.ticket_id, error = %e, "notification failed");
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
