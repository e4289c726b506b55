//! # Instances
//!
//! An instance is one slot of the instance table: a liveness flag, the
//! owning template's index and a zeroed state block sized by the template.

use std::mem;

use bytemuck::Pod;

use super::ids::{InstanceId, TemplateIndex};
use crate::error::{EngineError, EngineResult};

/// Opaque per-instance state.
///
/// The block is backed by 8-byte words so any [`Pod`] type with alignment
/// up to 8 can be viewed in place.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateBlock {
    words: Box<[u64]>,
    size: usize,
}

impl StateBlock {
    /// Allocates a zeroed block of `size` bytes.
    pub(crate) fn zeroed(size: usize) -> EngineResult<Self> {
        let count = size.div_ceil(mem::size_of::<u64>());
        let mut words = Vec::new();
        words
            .try_reserve_exact(count)
            .map_err(|_| EngineError::Allocation { requested: size })?;
        words.resize(count, 0);
        Ok(Self {
            words: words.into_boxed_slice(),
            size,
        })
    }

    /// Returns the size in bytes.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.size
    }

    /// Returns `true` for a zero-sized block.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Returns the raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &bytemuck::cast_slice::<u64, u8>(&self.words)[..self.size]
    }

    /// Returns the raw bytes mutably.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut bytemuck::cast_slice_mut::<u64, u8>(&mut self.words)[..self.size]
    }

    /// Views the leading bytes as a `T`.
    ///
    /// Returns `None` if the block is smaller than `T` or `T` needs more
    /// than 8-byte alignment.
    #[must_use]
    pub fn get<T: Pod>(&self) -> Option<&T> {
        let bytes = self.as_bytes().get(..mem::size_of::<T>())?;
        bytemuck::try_from_bytes(bytes).ok()
    }

    /// Views the leading bytes as a mutable `T`.
    ///
    /// Same conditions as [`get`](Self::get).
    pub fn get_mut<T: Pod>(&mut self) -> Option<&mut T> {
        let bytes = self.as_bytes_mut().get_mut(..mem::size_of::<T>())?;
        bytemuck::try_from_bytes_mut(bytes).ok()
    }
}

/// One slot of the instance table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instance {
    id: InstanceId,
    template: TemplateIndex,
    alive: bool,
    state: Option<StateBlock>,
}

impl Instance {
    /// Creates a never-used slot.
    #[inline]
    #[must_use]
    pub(crate) const fn vacant() -> Self {
        Self {
            id: InstanceId::NONE,
            template: TemplateIndex(0),
            alive: false,
            state: None,
        }
    }

    /// Creates a freshly spawned instance.
    pub(crate) fn spawned(id: InstanceId, template: TemplateIndex, state: StateBlock) -> Self {
        Self {
            id,
            template,
            alive: true,
            state: Some(state),
        }
    }

    /// Marks the instance dead and frees its state. The id and template stay
    /// for diagnostics.
    pub(crate) fn release(&mut self) {
        self.alive = false;
        self.state = None;
    }

    /// Returns this instance's id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> InstanceId {
        self.id
    }

    /// Returns the owning template's index.
    #[inline]
    #[must_use]
    pub const fn template(&self) -> TemplateIndex {
        self.template
    }

    /// Checks if the instance is alive.
    #[inline]
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.alive
    }

    /// Returns the state block of a live instance.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> Option<&StateBlock> {
        self.state.as_ref()
    }

    /// Returns the state block of a live instance mutably.
    #[inline]
    pub fn state_mut(&mut self) -> Option<&mut StateBlock> {
        self.state.as_mut()
    }

    /// Views the state as a `T`.
    #[must_use]
    pub fn data<T: Pod>(&self) -> Option<&T> {
        self.state.as_ref()?.get()
    }

    /// Views the state as a mutable `T`.
    pub fn data_mut<T: Pod>(&mut self) -> Option<&mut T> {
        self.state.as_mut()?.get_mut()
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::vacant()
    }
}
