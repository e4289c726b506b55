//! # Registry
//!
//! The central container for templates and instances.
//!
//! Owns the instance table, template metadata, constructor and destructor
//! tables, and weak links to every handler's pending queue so spawn and kill
//! can reach them.

use std::collections::{BTreeMap, HashMap};
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};

use bytemuck::Pod;
use tracing::{debug, error, trace, warn};

use super::ids::{InstanceId, TemplateIndex};
use super::instance::{Instance, StateBlock};
use super::table::InstanceTable;
use super::template::{Hook, Template};
use crate::config::EngineConfig;
use crate::dispatch::pending::{PendingLink, PendingOp, SharedPending};
use crate::error::{EngineError, EngineResult};

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a registry, used by handlers to refuse foreign registries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RegistryId(u64);

/// Outcome of [`Registry::teardown`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TeardownReport {
    /// Live instances that were destroyed.
    pub instances_destroyed: usize,
    /// Destructors that reported a failure (the instance was destroyed anyway).
    pub destructor_failures: usize,
    /// Handlers that were detached.
    pub handlers_detached: usize,
}

/// Template and instance registry.
///
/// # Example
///
/// ```rust,ignore
/// let mut registry = Registry::new()?;
/// registry.add_template("ObjectWall", TemplateIndex(1), 16)?;
///
/// let wall = registry.spawn(TemplateIndex(1))?;
/// assert!(registry.is_alive(wall));
/// registry.kill(wall)?;
/// ```
pub struct Registry {
    id: RegistryId,
    config: EngineConfig,
    templates: BTreeMap<TemplateIndex, Template>,
    constructors: HashMap<TemplateIndex, Hook>,
    destructors: HashMap<TemplateIndex, Hook>,
    table: InstanceTable,
    alive_count: usize,
    handlers: Vec<PendingLink>,
}

impl Registry {
    /// Creates a registry with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Allocation`] if the instance table cannot be
    /// allocated.
    pub fn new() -> EngineResult<Self> {
        Self::with_config(&EngineConfig::default())
    }

    /// Creates a registry sized by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] for an invalid configuration and
    /// [`EngineError::Allocation`] if the instance table cannot be allocated.
    pub fn with_config(config: &EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let table = InstanceTable::new(
            config.initial_instance_capacity,
            config.max_instance_capacity,
        )?;
        Ok(Self {
            id: RegistryId(NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed)),
            config: config.clone(),
            templates: BTreeMap::new(),
            constructors: HashMap::new(),
            destructors: HashMap::new(),
            table,
            alive_count: 0,
            handlers: Vec::new(),
        })
    }

    /// Returns this registry's identity.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> RegistryId {
        self.id
    }

    /// Returns the configuration the registry was built with.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    // =========================================================================
    // Templates
    // =========================================================================

    /// Registers a template.
    ///
    /// # Arguments
    ///
    /// * `name` - Display name used in diagnostics, must not be empty
    /// * `index` - Caller-chosen index, must be unused
    /// * `size` - Per-instance state size in bytes
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::EmptyName`] or [`EngineError::DuplicateTemplate`].
    pub fn add_template(
        &mut self,
        name: impl Into<String>,
        index: TemplateIndex,
        size: usize,
    ) -> EngineResult<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(EngineError::EmptyName);
        }
        if self.templates.contains_key(&index) {
            return Err(EngineError::DuplicateTemplate(index));
        }
        debug!("template {} ({}) registered, {} bytes", index, name, size);
        self.templates.insert(index, Template::new(index, name, size));
        Ok(())
    }

    /// Registers a template sized and named after the state type `T`.
    ///
    /// # Errors
    ///
    /// Same as [`add_template`](Self::add_template).
    pub fn add_template_of<T: Pod>(&mut self, index: TemplateIndex) -> EngineResult<()> {
        let name = std::any::type_name::<T>()
            .rsplit("::")
            .next()
            .unwrap_or_default();
        self.add_template(name, index, mem::size_of::<T>())
    }

    /// Returns a registered template.
    #[must_use]
    pub fn template(&self, index: TemplateIndex) -> Option<&Template> {
        self.templates.get(&index)
    }

    /// Returns a template's display name.
    #[must_use]
    pub fn template_name(&self, index: TemplateIndex) -> Option<&str> {
        self.templates.get(&index).map(Template::name)
    }

    /// Iterates over registered templates in index order.
    pub fn templates(&self) -> impl Iterator<Item = &Template> {
        self.templates.values()
    }

    fn display_name(&self, index: TemplateIndex) -> &str {
        self.template_name(index).unwrap_or("<unregistered>")
    }

    /// Installs or clears the constructor for a template index.
    ///
    /// Returns the previous constructor.
    pub fn set_constructor(&mut self, index: TemplateIndex, hook: Option<Hook>) -> Option<Hook> {
        match hook {
            Some(hook) => self.constructors.insert(index, hook),
            None => self.constructors.remove(&index),
        }
    }

    /// Installs or clears the destructor for a template index.
    ///
    /// Returns the previous destructor.
    pub fn set_destructor(&mut self, index: TemplateIndex, hook: Option<Hook>) -> Option<Hook> {
        match hook {
            Some(hook) => self.destructors.insert(index, hook),
            None => self.destructors.remove(&index),
        }
    }

    /// Returns the constructor installed for a template index.
    #[must_use]
    pub fn constructor(&self, index: TemplateIndex) -> Option<Hook> {
        self.constructors.get(&index).copied()
    }

    /// Returns the destructor installed for a template index.
    #[must_use]
    pub fn destructor(&self, index: TemplateIndex) -> Option<Hook> {
        self.destructors.get(&index).copied()
    }

    // =========================================================================
    // Instance lifecycle
    // =========================================================================

    /// Spawns an instance of a template.
    ///
    /// The state block is zeroed, then the constructor (if any) runs. A
    /// failing constructor is logged and the instance stays spawned. Every
    /// live handler is told to insert the new id on its next reconciliation.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownTemplate`] without touching the table,
    /// or [`EngineError::IdSpaceExhausted`] / [`EngineError::Allocation`] if
    /// the table or the state block cannot be allocated.
    pub fn spawn(&mut self, index: TemplateIndex) -> EngineResult<InstanceId> {
        let size = self
            .templates
            .get(&index)
            .map(Template::size)
            .ok_or(EngineError::UnknownTemplate(index))?;

        let id = self.table.reserve_next()?;
        let state = StateBlock::zeroed(size)?;
        let constructor = self.constructors.get(&index).copied();

        let Some(slot) = self.table.get_mut(id) else {
            unreachable!("reserved id {id} has no slot");
        };
        *slot = Instance::spawned(id, index, state);
        if let Some(constructor) = constructor {
            if let Err(err) = constructor(slot) {
                warn!(
                    "constructor of template {} ({}) failed for instance {}: {}",
                    index,
                    self.display_name(index),
                    id,
                    err
                );
            }
        }
        self.alive_count += 1;
        trace!("spawned instance {} of template {}", id, index);

        self.notify(PendingOp::Insert(id));
        Ok(id)
    }

    /// Kills an instance.
    ///
    /// Killing a dead, reserved or unknown id is a logged no-op. Otherwise
    /// the destructor (if any) runs, the state is freed, the instance is
    /// marked dead and every live handler is told to remove it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DestructorFailed`] if the destructor failed.
    /// The instance is dead and its state freed regardless.
    pub fn kill(&mut self, id: InstanceId) -> EngineResult<()> {
        let Some(slot) = self.table.get_mut(id).filter(|slot| slot.is_alive()) else {
            warn!("instance {} is not alive", id);
            return Ok(());
        };

        let template = slot.template();
        let outcome = match self.destructors.get(&template) {
            Some(destructor) => destructor(slot),
            None => Ok(()),
        };
        slot.release();
        self.alive_count -= 1;
        trace!("killed instance {} of template {}", id, template);

        self.notify(PendingOp::Remove(id));

        outcome.map_err(|source| {
            error!(
                "destructor of template {} ({}) failed for instance {}: {}",
                template,
                self.display_name(template),
                id,
                source
            );
            EngineError::DestructorFailed {
                id,
                template,
                source,
            }
        })
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Checks if an instance is alive.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, id: InstanceId) -> bool {
        self.table.get(id).is_some_and(Instance::is_alive)
    }

    /// Returns the slot of an id, live or dead.
    #[must_use]
    pub fn instance(&self, id: InstanceId) -> Option<&Instance> {
        self.table.get(id)
    }

    /// Returns the slot of an id mutably, live or dead.
    pub fn instance_mut(&mut self, id: InstanceId) -> Option<&mut Instance> {
        self.table.get_mut(id)
    }

    /// Views a live instance's state as a `T`.
    #[must_use]
    pub fn state<T: Pod>(&self, id: InstanceId) -> Option<&T> {
        self.table.get(id)?.data()
    }

    /// Views a live instance's state as a mutable `T`.
    pub fn state_mut<T: Pod>(&mut self, id: InstanceId) -> Option<&mut T> {
        self.table.get_mut(id)?.data_mut()
    }

    /// Iterates over live instances in id order.
    pub fn iter_alive(&self) -> impl Iterator<Item = &Instance> {
        self.table.iter_alive()
    }

    /// Returns the number of live instances.
    #[inline]
    #[must_use]
    pub const fn alive_count(&self) -> usize {
        self.alive_count
    }

    /// Returns the instance table capacity.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Returns the id the next spawn will receive.
    #[inline]
    #[must_use]
    pub const fn next_id(&self) -> InstanceId {
        self.table.next_id()
    }

    // =========================================================================
    // Handler links
    // =========================================================================

    pub(crate) fn attach(&mut self, pending: &SharedPending) {
        self.handlers.push(std::rc::Rc::downgrade(pending));
    }

    /// Returns the number of handlers still registered.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers
            .iter()
            .filter(|link| link.strong_count() > 0)
            .count()
    }

    fn notify(&mut self, op: PendingOp) {
        self.handlers.retain(|link| match link.upgrade() {
            Some(pending) => {
                pending.borrow_mut().push(op);
                true
            }
            None => false,
        });
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Destroys every live instance, forgets all templates and hooks, and
    /// detaches every handler.
    ///
    /// Destructor failures are logged and counted but do not stop teardown.
    /// Ids are not reused afterwards.
    pub fn teardown(&mut self) -> TeardownReport {
        let mut report = TeardownReport::default();

        for slot in self.table.iter_alive_mut() {
            let template = slot.template();
            if let Some(destructor) = self.destructors.get(&template) {
                if let Err(err) = destructor(slot) {
                    warn!(
                        "destructor of template {} ({}) failed for instance {} during teardown: {}",
                        template,
                        self.templates
                            .get(&template)
                            .map_or("<unregistered>", Template::name),
                        slot.id(),
                        err
                    );
                    report.destructor_failures += 1;
                }
            }
            slot.release();
            report.instances_destroyed += 1;
        }
        self.alive_count = 0;

        for link in self.handlers.drain(..) {
            if let Some(pending) = link.upgrade() {
                pending.borrow_mut().detach();
                report.handlers_detached += 1;
            }
        }

        self.templates.clear();
        self.constructors.clear();
        self.destructors.clear();

        debug!(
            "registry torn down: {} instances, {} destructor failures, {} handlers",
            report.instances_destroyed, report.destructor_failures, report.handlers_detached
        );
        report
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        if self.alive_count > 0 || !self.handlers.is_empty() {
            self.teardown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HookError;

    const WALL: TemplateIndex = TemplateIndex(1);
    const ENEMY: TemplateIndex = TemplateIndex(2);

    #[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
    #[repr(C)]
    struct ObjectEnemy {
        x: i32,
        y: i32,
        health: f32,
        dead: u32,
    }

    fn enemy_ctor(instance: &mut Instance) -> crate::HookResult {
        let enemy = instance
            .data_mut::<ObjectEnemy>()
            .ok_or_else(|| HookError::new("bad state size"))?;
        enemy.health = 20.0;
        Ok(())
    }

    fn failing_hook(_: &mut Instance) -> crate::HookResult {
        Err(HookError::new("refused"))
    }

    fn registry() -> Registry {
        let mut registry = Registry::with_config(&EngineConfig::compact()).unwrap();
        registry.add_template("ObjectWall", WALL, 16).unwrap();
        registry.add_template_of::<ObjectEnemy>(ENEMY).unwrap();
        registry
    }

    #[test]
    fn test_template_registration_rules() {
        let mut registry = registry();
        assert_eq!(
            registry.add_template("", TemplateIndex(3), 4),
            Err(EngineError::EmptyName)
        );
        assert_eq!(
            registry.add_template("Other", WALL, 4),
            Err(EngineError::DuplicateTemplate(WALL))
        );
        assert_eq!(registry.template_name(WALL), Some("ObjectWall"));
        assert_eq!(registry.template_name(ENEMY), Some("ObjectEnemy"));
        assert_eq!(registry.template(ENEMY).unwrap().size(), 16);
        assert_eq!(registry.templates().count(), 2);
    }

    #[test]
    fn test_spawn_unknown_template_leaves_table_alone() {
        let mut registry = registry();
        let next = registry.next_id();
        assert_eq!(
            registry.spawn(TemplateIndex(40)),
            Err(EngineError::UnknownTemplate(TemplateIndex(40)))
        );
        assert_eq!(registry.next_id(), next);
        assert_eq!(registry.alive_count(), 0);
    }

    #[test]
    fn test_spawn_runs_constructor() {
        let mut registry = registry();
        registry.set_constructor(ENEMY, Some(enemy_ctor));
        let id = registry.spawn(ENEMY).unwrap();
        assert!(registry.is_alive(id));
        let enemy = registry.state::<ObjectEnemy>(id).unwrap();
        assert!((enemy.health - 20.0).abs() < f32::EPSILON);
        assert_eq!(enemy.x, 0);
    }

    #[test]
    fn test_failing_constructor_still_spawns() {
        let mut registry = registry();
        registry.set_constructor(WALL, Some(failing_hook));
        let id = registry.spawn(WALL).unwrap();
        assert!(registry.is_alive(id));
        assert_eq!(registry.alive_count(), 1);
    }

    #[test]
    fn test_kill_is_idempotent() {
        let mut registry = registry();
        let id = registry.spawn(WALL).unwrap();
        registry.kill(id).unwrap();
        assert!(!registry.is_alive(id));

        assert_eq!(registry.kill(id), Ok(()));
        assert_eq!(registry.kill(InstanceId::NONE), Ok(()));
        assert_eq!(registry.kill(InstanceId::from_raw(10_000)), Ok(()));
        assert_eq!(registry.alive_count(), 0);
    }

    #[test]
    fn test_destructor_failure_still_kills() {
        let mut registry = registry();
        registry.set_destructor(WALL, Some(failing_hook));
        let id = registry.spawn(WALL).unwrap();

        let err = registry.kill(id).unwrap_err();
        assert!(matches!(err, EngineError::DestructorFailed { id: failed, .. } if failed == id));
        assert!(!registry.is_alive(id));
        assert!(registry.instance(id).unwrap().state().is_none());
    }

    #[test]
    fn test_hooks_are_swappable() {
        let mut registry = registry();
        assert!(registry.constructor(ENEMY).is_none());
        assert!(registry.set_constructor(ENEMY, Some(enemy_ctor)).is_none());
        assert!(registry.constructor(ENEMY).is_some());
        assert!(registry.set_constructor(ENEMY, None).is_some());
        assert!(registry.constructor(ENEMY).is_none());
    }

    #[test]
    fn test_ids_unique_across_growth() {
        let mut registry = registry();
        let mut live = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for round in 0..100 {
            let id = registry.spawn(if round % 2 == 0 { WALL } else { ENEMY }).unwrap();
            assert!(seen.insert(id), "id {id} handed out twice");
            live.push(id);
            if round % 3 == 0 {
                let victim = live.remove(0);
                registry.kill(victim).unwrap();
            }
        }
        assert_eq!(registry.alive_count(), live.len());
        assert!(registry.capacity() >= 101);
        let alive: Vec<InstanceId> = registry.iter_alive().map(Instance::id).collect();
        assert_eq!(alive, live);
    }

    #[test]
    fn test_id_space_exhausted() {
        let config = EngineConfig {
            initial_instance_capacity: 2,
            max_instance_capacity: 4,
            ..EngineConfig::compact()
        };
        let mut registry = Registry::with_config(&config).unwrap();
        registry.add_template("ObjectWall", WALL, 0).unwrap();
        for _ in 0..3 {
            registry.spawn(WALL).unwrap();
        }
        assert_eq!(
            registry.spawn(WALL),
            Err(EngineError::IdSpaceExhausted { capacity: 4 })
        );
        assert_eq!(registry.alive_count(), 3);
    }

    #[test]
    fn test_teardown_reports_failures() {
        let mut registry = registry();
        registry.set_destructor(WALL, Some(failing_hook));
        registry.spawn(WALL).unwrap();
        registry.spawn(WALL).unwrap();
        registry.spawn(ENEMY).unwrap();

        let report = registry.teardown();
        assert_eq!(report.instances_destroyed, 3);
        assert_eq!(report.destructor_failures, 2);
        assert_eq!(registry.alive_count(), 0);
        assert!(registry.template(WALL).is_none());
        assert_eq!(registry.spawn(WALL), Err(EngineError::UnknownTemplate(WALL)));
    }
}
