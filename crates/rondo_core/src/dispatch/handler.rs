//! # Handlers
//!
//! A handler runs one kind of event (step, draw, a button press) over every
//! live instance, in priority order.
//!
//! ## Deferred mutation
//!
//! Spawns and kills never touch the active set directly. They are staged in
//! the handler's pending queue and applied in full before and after each
//! traversal, so a callback may spawn or kill freely without disturbing the
//! traversal it is part of. Constructors and destructors still run at the
//! moment of the spawn or kill.

use std::collections::{HashMap, HashSet};

use tracing::{debug, error, trace};

use super::context::Context;
use super::pending::{PendingOp, PendingQueue, SharedPending};
use crate::error::{EngineError, EngineResult, HookResult, ReconciliationError};
use crate::queue::OrderedRing;
use crate::registry::{Instance, InstanceId, Registry, RegistryId, TemplateIndex};

/// Callback bound to a template index.
pub type Callback = Box<dyn FnMut(&mut Context<'_>) -> HookResult>;

/// Maps a template index to a dispatch priority. Lower runs first.
pub type PriorityFn = Box<dyn Fn(TemplateIndex) -> i32>;

/// What [`Handler::destroy`] released.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Released {
    /// Entries dropped from the active set.
    pub active: usize,
    /// Pending operations discarded.
    pub pending: usize,
}

/// Ordered event dispatcher over a registry's instances.
///
/// # Example
///
/// ```rust,ignore
/// let mut draw = Handler::with_priority(&mut registry, |index| match index {
///     PLAYER => 2,
///     ENEMY => -2,
///     _ => 0,
/// })?;
/// draw.bind(PLAYER, |ctx| {
///     let player = ctx.state_mut::<Player>().ok_or_else(|| HookError::new("no state"))?;
///     player.health /= 2.0;
///     Ok(())
/// });
///
/// let failures = draw.run(&mut registry)?;
/// ```
pub struct Handler {
    registry: RegistryId,
    active: OrderedRing<InstanceId>,
    pending: SharedPending,
    callbacks: HashMap<TemplateIndex, Callback>,
    priority: Option<PriorityFn>,
    /// First id spawned after this handler was created.
    watermark: InstanceId,
    /// Ids whose insert was skipped because they died before reconciliation.
    cancelled: HashSet<InstanceId>,
}

impl Handler {
    /// Creates a handler where every template has priority 0, so instances
    /// run in spawn order.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Allocation`] if the queues cannot be allocated.
    pub fn new(registry: &mut Registry) -> EngineResult<Self> {
        Self::build(registry, None)
    }

    /// Creates a handler ordered by `priority`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Allocation`] if the queues cannot be allocated.
    pub fn with_priority<F>(registry: &mut Registry, priority: F) -> EngineResult<Self>
    where
        F: Fn(TemplateIndex) -> i32 + 'static,
    {
        Self::build(registry, Some(Box::new(priority)))
    }

    fn build(registry: &mut Registry, priority: Option<PriorityFn>) -> EngineResult<Self> {
        let config = registry.config();
        let active = OrderedRing::with_capacity(config.handler_queue_capacity)?;
        let pending = PendingQueue::shared(config.pending_queue_capacity)?;
        registry.attach(&pending);

        Ok(Self {
            registry: registry.id(),
            active,
            pending,
            callbacks: HashMap::new(),
            priority,
            watermark: registry.next_id(),
            cancelled: HashSet::new(),
        })
    }

    // =========================================================================
    // Callbacks
    // =========================================================================

    /// Binds `callback` to a template, replacing any previous binding.
    pub fn bind<F>(&mut self, index: TemplateIndex, callback: F)
    where
        F: FnMut(&mut Context<'_>) -> HookResult + 'static,
    {
        self.callbacks.insert(index, Box::new(callback));
    }

    /// Removes a template's callback. Returns `true` if one was bound.
    pub fn unbind(&mut self, index: TemplateIndex) -> bool {
        self.callbacks.remove(&index).is_some()
    }

    /// Checks if a template has a callback.
    #[must_use]
    pub fn is_bound(&self, index: TemplateIndex) -> bool {
        self.callbacks.contains_key(&index)
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Runs every bound callback once over the active set.
    ///
    /// Pending operations are applied first, then each active instance that
    /// is still alive and has a bound callback is visited in priority order,
    /// then operations staged during the traversal are applied.
    ///
    /// # Returns
    ///
    /// The number of callbacks that failed.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ForeignRegistry`] or
    /// [`EngineError::HandlerDetached`] without running anything, and
    /// [`EngineError::Reconciliation`] if either reconciliation fails.
    pub fn run(&mut self, registry: &mut Registry) -> EngineResult<usize> {
        if registry.id() != self.registry {
            return Err(EngineError::ForeignRegistry);
        }
        if self.pending.borrow().is_detached() {
            return Err(EngineError::HandlerDetached);
        }

        self.reconcile(registry)?;

        let mut failures = 0;
        for position in 0..self.active.len() {
            let Some(&id) = self.active.get(position) else {
                break;
            };
            let Some(template) = registry
                .instance(id)
                .filter(|slot| slot.is_alive())
                .map(Instance::template)
            else {
                continue;
            };
            let Some(callback) = self.callbacks.get_mut(&template) else {
                continue;
            };

            let outcome = callback(&mut Context::new(registry, id, template));
            if let Err(err) = outcome {
                error!(
                    "callback for template {} ({}) failed on instance {}: {}",
                    template,
                    registry.template_name(template).unwrap_or("<unregistered>"),
                    id,
                    err
                );
                failures += 1;
            }
        }

        self.reconcile(registry)?;
        Ok(failures)
    }

    /// Applies every pending operation to the active set, in FIFO order.
    ///
    /// Each operation leaves the queue only once applied; on failure the
    /// failing operation and everything behind it stay queued.
    fn reconcile(&mut self, registry: &Registry) -> Result<usize, ReconciliationError> {
        let mut applied = 0;
        loop {
            let next = self.pending.borrow().front();
            let Some(op) = next else {
                break;
            };
            if let Err(err) = self.apply(op, registry) {
                error!("failed to apply {:?}: {}", op, err);
                return Err(err);
            }
            self.pending.borrow_mut().pop_front();
            applied += 1;
        }
        if applied > 0 {
            trace!("reconciled {} pending operations", applied);
        }
        Ok(applied)
    }

    fn apply(&mut self, op: PendingOp, registry: &Registry) -> Result<(), ReconciliationError> {
        match op {
            PendingOp::Insert(id) => {
                let Some(template) = registry
                    .instance(id)
                    .filter(|slot| slot.is_alive())
                    .map(Instance::template)
                else {
                    // Spawned and killed between two reconciliations: the
                    // matching remove is already queued behind this insert.
                    self.cancelled.insert(id);
                    return Ok(());
                };
                let priority = self.priority.as_ref().map_or(0, |priority| priority(template));
                self.active.push(id, priority)?;
            }
            PendingOp::Remove(id) => {
                if let Some(position) = self.active.position(|&active| active == id) {
                    self.active.remove_at(position)?;
                } else if self.cancelled.remove(&id) {
                    trace!("insert and remove of {} cancelled out", id);
                } else if id < self.watermark {
                    trace!("{} predates this handler", id);
                } else {
                    return Err(ReconciliationError::MissingInstance(id));
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Returns the active set.
    #[must_use]
    pub const fn active(&self) -> &OrderedRing<InstanceId> {
        &self.active
    }

    /// Returns the number of instances in the active set.
    #[must_use]
    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    /// Iterates the active set in dispatch order.
    pub fn active_ids(&self) -> impl Iterator<Item = InstanceId> + '_ {
        self.active.iter().map(|(&id, _)| id)
    }

    /// Returns the number of operations waiting for the next run.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Returns the identity of the registry this handler belongs to.
    #[must_use]
    pub const fn registry_id(&self) -> RegistryId {
        self.registry
    }

    /// Releases the active set, pending queue and callbacks. The registry
    /// stops notifying this handler.
    #[must_use = "the report says what was dropped"]
    pub fn destroy(mut self) -> Released {
        let released = Released {
            active: self.active.len(),
            pending: self.pending.borrow_mut().clear(),
        };
        self.active.clear();
        self.callbacks.clear();
        debug!(
            "handler destroyed: {} active, {} pending released",
            released.active, released.pending
        );
        released
    }
}
