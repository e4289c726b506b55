//! # Engine Error Types
//!
//! All errors that can occur in the registry and dispatch engine.

use thiserror::Error;

use crate::queue::RingError;
use crate::registry::{InstanceId, TemplateIndex};

/// Failure reported by a constructor, destructor or handler callback.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct HookError {
    message: String,
}

impl HookError {
    /// Creates a hook error with a human readable reason.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the reason given by the hook.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Result type returned by hooks and callbacks.
pub type HookResult = Result<(), HookError>;

/// Errors that can occur while applying a handler's pending operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationError {
    /// A remove operation named an instance the active set never held.
    #[error("instance {0} is not in the active set")]
    MissingInstance(InstanceId),

    /// The active set rejected the operation.
    #[error("active set update failed: {0}")]
    Queue(#[from] RingError),
}

/// Errors that can occur in the engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Heap exhaustion while growing a table or allocating state.
    #[error("allocation of {requested} elements failed")]
    Allocation {
        /// Number of elements requested.
        requested: usize,
    },

    /// The instance table cannot grow past its configured maximum.
    #[error("instance id space exhausted at capacity {capacity}")]
    IdSpaceExhausted {
        /// The capacity that could not be doubled.
        capacity: u64,
    },

    /// No template is registered at this index.
    #[error("template index {0} is not registered")]
    UnknownTemplate(TemplateIndex),

    /// A template is already registered at this index.
    #[error("template index {0} is already taken")]
    DuplicateTemplate(TemplateIndex),

    /// Template names must not be empty.
    #[error("template name must not be empty")]
    EmptyName,

    /// The destructor failed; the instance was still killed.
    #[error("destructor of template {template} failed for instance {id}: {source}")]
    DestructorFailed {
        /// The killed instance.
        id: InstanceId,
        /// Its template.
        template: TemplateIndex,
        /// What the destructor reported.
        source: HookError,
    },

    /// A handler could not apply its pending operations.
    #[error("reconciliation failed: {0}")]
    Reconciliation(#[from] ReconciliationError),

    /// A handler was run against a registry it was not created with.
    #[error("handler belongs to a different registry")]
    ForeignRegistry,

    /// The handler's registry was torn down.
    #[error("handler was detached by registry teardown")]
    HandlerDetached,

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<RingError> for EngineError {
    fn from(err: RingError) -> Self {
        match err {
            RingError::Allocation { requested } => Self::Allocation { requested },
            RingError::ZeroCapacity => Self::InvalidConfig(RingError::<std::convert::Infallible>::ZeroCapacity.to_string()),
            other => Self::Reconciliation(ReconciliationError::Queue(other)),
        }
    }
}

impl From<EngineError> for HookError {
    fn from(err: EngineError) -> Self {
        Self::new(err.to_string())
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
