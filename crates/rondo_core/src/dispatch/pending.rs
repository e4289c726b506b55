//! # Pending Operations
//!
//! Structural changes a handler has been told about but not yet applied to
//! its active set.
//!
//! The registry holds a weak link to each handler's queue and pushes onto
//! it on every spawn and kill. The handler drains it before and after each
//! traversal, never during one.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use crate::error::{EngineError, EngineResult};
use crate::registry::InstanceId;

/// A staged change to a handler's active set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PendingOp {
    /// Drop the instance from the active set.
    Remove(InstanceId),
    /// Add the instance to the active set.
    Insert(InstanceId),
}

impl PendingOp {
    /// Returns the instance the operation refers to.
    #[inline]
    #[must_use]
    pub const fn id(self) -> InstanceId {
        match self {
            Self::Remove(id) | Self::Insert(id) => id,
        }
    }
}

/// FIFO of pending operations shared between a handler and its registry.
#[derive(Debug)]
pub(crate) struct PendingQueue {
    ops: VecDeque<PendingOp>,
    detached: bool,
}

/// Shared handle owned by the handler.
pub(crate) type SharedPending = Rc<RefCell<PendingQueue>>;

/// Registration link held by the registry.
pub(crate) type PendingLink = Weak<RefCell<PendingQueue>>;

impl PendingQueue {
    pub(crate) fn shared(capacity: usize) -> EngineResult<SharedPending> {
        let mut ops = VecDeque::new();
        ops.try_reserve_exact(capacity)
            .map_err(|_| EngineError::Allocation {
                requested: capacity,
            })?;
        Ok(Rc::new(RefCell::new(Self {
            ops,
            detached: false,
        })))
    }

    #[inline]
    pub(crate) fn push(&mut self, op: PendingOp) {
        if !self.detached {
            self.ops.push_back(op);
        }
    }

    #[inline]
    pub(crate) fn front(&self) -> Option<PendingOp> {
        self.ops.front().copied()
    }

    #[inline]
    pub(crate) fn pop_front(&mut self) -> Option<PendingOp> {
        self.ops.pop_front()
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.ops.len()
    }

    /// Discards everything still queued, returning how many ops were dropped.
    pub(crate) fn clear(&mut self) -> usize {
        let dropped = self.ops.len();
        self.ops.clear();
        dropped
    }

    /// Cuts the queue off from its registry. Later pushes are ignored.
    pub(crate) fn detach(&mut self) {
        self.detached = true;
        self.ops.clear();
    }

    #[inline]
    pub(crate) const fn is_detached(&self) -> bool {
        self.detached
    }
}
