//! SLA policy resolution.
//!
//! A policy is looked up most-specific first: the exact
//! (tenant, priority, category) row, then the tenant's wildcard row for the
//! priority. Nothing here writes.

use std::collections::HashMap;

use tracing::debug;

use desk_core::enums::{Category, Priority};
use desk_core::sla::SlaPolicy;
use desk_core::validation::validate_policy;
use desk_storage::Storage;

use crate::engine::Engine;
use crate::error::{EngineError, Result};

/// Resolves the active policy for a ticket's classification.
///
/// # Errors
///
/// [`EngineError::PolicyNotFound`] when neither the exact nor the wildcard
/// policy exists (or both are inactive).
pub fn resolve_policy(
    store: &dyn Storage,
    tenant_id: &str,
    priority: Priority,
    category: Category,
) -> Result<SlaPolicy> {
    if let Some(policy) = store.find_policy(tenant_id, priority, Some(category))? {
        return Ok(policy);
    }
    if let Some(policy) = store.find_policy(tenant_id, priority, None)? {
        debug!(tenant_id, %priority, %category, "using wildcard SLA policy");
        return Ok(policy);
    }
    Err(EngineError::PolicyNotFound {
        tenant_id: tenant_id.to_string(),
        priority,
        category,
    })
}

/// Memoizes [`resolve_policy`] for the lifetime of one evaluation pass.
///
/// A sweep builds one cache and drops it at the end, so policy edits take
/// effect on the next pass. Misses are cached too.
pub struct PolicyCache<'a> {
    store: &'a dyn Storage,
    entries: HashMap<(String, Priority, Category), Option<SlaPolicy>>,
}

impl<'a> PolicyCache<'a> {
    pub fn new(store: &'a dyn Storage) -> Self {
        Self {
            store,
            entries: HashMap::new(),
        }
    }

    pub fn resolve(
        &mut self,
        tenant_id: &str,
        priority: Priority,
        category: Category,
    ) -> Result<SlaPolicy> {
        let key = (tenant_id.to_string(), priority, category);
        if let Some(cached) = self.entries.get(&key) {
            return cached.clone().ok_or_else(|| EngineError::PolicyNotFound {
                tenant_id: tenant_id.to_string(),
                priority,
                category,
            });
        }

        match resolve_policy(self.store, tenant_id, priority, category) {
            Ok(policy) => {
                self.entries.insert(key, Some(policy.clone()));
                Ok(policy)
            }
            Err(e @ EngineError::PolicyNotFound { .. }) => {
                self.entries.insert(key, None);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Like [`resolve`](Self::resolve) but maps "no policy" to `None`.
    pub fn lookup(
        &mut self,
        tenant_id: &str,
        priority: Priority,
        category: Category,
    ) -> Result<Option<SlaPolicy>> {
        match self.resolve(tenant_id, priority, category) {
            Ok(policy) => Ok(Some(policy)),
            Err(EngineError::PolicyNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Engine {
    /// Stores a policy, replacing the one with the same
    /// (tenant, priority, category).
    pub fn set_policy(&self, policy: &SlaPolicy) -> Result<SlaPolicy> {
        validate_policy(policy)?;
        self.require_tenant(&policy.tenant_id)?;
        let stored = self.store.upsert_policy(policy)?;
        debug!(tenant_id = %stored.tenant_id, id = stored.id, "SLA policy stored");
        Ok(stored)
    }

    pub fn list_policies(&self, tenant_id: &str) -> Result<Vec<SlaPolicy>> {
        Ok(self.store.list_policies(tenant_id)?)
    }

    pub fn resolve_policy(
        &self,
        tenant_id: &str,
        priority: Priority,
        category: Category,
    ) -> Result<SlaPolicy> {
        resolve_policy(self.store(), tenant_id, priority, category)
    }
}
