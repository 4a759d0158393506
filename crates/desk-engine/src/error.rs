//! Engine error types.

use desk_core::enums::{Category, Priority, TicketStatus};
use desk_core::validation::ValidationError;
use desk_storage::StorageError;

use crate::directory::DirectoryError;

/// Errors returned by engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A ticket, staff member, tenant or snapshot does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The ticket's current state does not permit the operation.
    #[error("ticket {id}: {reason}")]
    InvalidState { id: String, reason: String },

    #[error("cannot assign ticket {id}: {reason}")]
    AssignmentConflict { id: String, reason: String },

    #[error("staff {staff_id} has no free capacity")]
    CapacityExhausted { staff_id: String },

    #[error("no SLA policy for tenant {tenant_id}, priority {priority}, category {category}")]
    PolicyNotFound {
        tenant_id: String,
        priority: Priority,
        category: Category,
    },

    #[error("tenant {0} is inactive")]
    TenantInactive(String),

    /// The ticket changed in another process between read and write.
    #[error("ticket {id} was modified concurrently; retry the operation")]
    Conflict { id: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Storage(StorageError),
}

/// Convenience alias used throughout the engine crate.
pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub(crate) fn invalid_state(ticket_id: &str, status: TicketStatus, action: &str) -> Self {
        Self::InvalidState {
            id: ticket_id.to_string(),
            reason: format!("cannot {action} in status {status}"),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState { .. })
    }
}

/// Lifts storage failures into the engine's vocabulary: missing rows become
/// [`EngineError::NotFound`] and lost version races [`EngineError::Conflict`].
impl From<StorageError> for EngineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { entity, id } => Self::NotFound { entity, id },
            StorageError::Conflict { id, .. } => Self::Conflict { id },
            other => Self::Storage(other),
        }
    }
}
