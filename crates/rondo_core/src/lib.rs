//! # RONDO Core
//!
//! Instance registry and ordered event dispatch for small game loops:
//! - Templates describe object kinds, instances are live objects
//! - Handlers run one event over every live instance, in priority order
//! - Callbacks may spawn and kill freely while a handler runs
//!
//! ## Architecture Rules
//!
//! 1. **Ids are never reused** - a stale id can only ever name a dead slot
//! 2. **Deferred structure** - active sets change only between traversals
//! 3. **Stable order** - equal priorities run in spawn order
//!
//! ## Example
//!
//! ```rust,ignore
//! use rondo_core::{Handler, Registry, TemplateIndex};
//!
//! let mut registry = Registry::new()?;
//! registry.add_template("ObjectWall", TemplateIndex(1), 16)?;
//!
//! let mut step = Handler::new(&mut registry)?;
//! step.bind(TemplateIndex(1), |ctx| {
//!     ctx.kill_self()?;
//!     Ok(())
//! });
//!
//! registry.spawn(TemplateIndex(1))?;
//! step.run(&mut registry)?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod queue;
pub mod registry;

pub use config::EngineConfig;
pub use dispatch::{Callback, Context, Handler, PendingOp, PriorityFn, Released};
pub use error::{EngineError, EngineResult, HookError, HookResult, ReconciliationError};
pub use queue::{OrderedRing, RingError, RingTable};
pub use registry::{
    Hook, Instance, InstanceId, Registry, RegistryId, StateBlock, TeardownReport, Template,
    TemplateIndex,
};
