//! # Callback Context
//!
//! What a handler callback sees while it runs: the instance being visited
//! and the registry it lives in, so the callback can spawn and kill.

use bytemuck::Pod;

use crate::error::EngineResult;
use crate::registry::{Instance, InstanceId, Registry, StateBlock, TemplateIndex};

/// Per-visit view handed to a bound callback.
pub struct Context<'r> {
    registry: &'r mut Registry,
    id: InstanceId,
    template: TemplateIndex,
}

impl<'r> Context<'r> {
    pub(crate) fn new(registry: &'r mut Registry, id: InstanceId, template: TemplateIndex) -> Self {
        Self {
            registry,
            id,
            template,
        }
    }

    /// Returns the visited instance's id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> InstanceId {
        self.id
    }

    /// Returns the visited instance's template.
    #[inline]
    #[must_use]
    pub const fn template(&self) -> TemplateIndex {
        self.template
    }

    /// Returns the visited instance. The slot may be dead if the callback
    /// already killed it.
    #[must_use]
    pub fn instance(&self) -> Option<&Instance> {
        self.registry.instance(self.id)
    }

    /// Returns the visited instance's raw state.
    pub fn state_block(&mut self) -> Option<&mut StateBlock> {
        self.registry.instance_mut(self.id)?.state_mut()
    }

    /// Views the visited instance's state as a `T`.
    #[must_use]
    pub fn state<T: Pod>(&self) -> Option<&T> {
        self.registry.state(self.id)
    }

    /// Views the visited instance's state as a mutable `T`.
    pub fn state_mut<T: Pod>(&mut self) -> Option<&mut T> {
        self.registry.state_mut(self.id)
    }

    /// Spawns an instance. It joins the active set after this run.
    ///
    /// # Errors
    ///
    /// Same as [`Registry::spawn`].
    pub fn spawn(&mut self, index: TemplateIndex) -> EngineResult<InstanceId> {
        self.registry.spawn(index)
    }

    /// Kills an instance. It is skipped for the rest of this run if not yet
    /// visited, and leaves the active set after this run.
    ///
    /// # Errors
    ///
    /// Same as [`Registry::kill`].
    pub fn kill(&mut self, id: InstanceId) -> EngineResult<()> {
        self.registry.kill(id)
    }

    /// Kills the visited instance.
    ///
    /// # Errors
    ///
    /// Same as [`Registry::kill`].
    pub fn kill_self(&mut self) -> EngineResult<()> {
        self.registry.kill(self.id)
    }

    /// Returns the registry.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &*self.registry
    }

    /// Returns the registry mutably.
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut *self.registry
    }
}
