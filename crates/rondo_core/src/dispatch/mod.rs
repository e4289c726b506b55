//! # Dispatch
//!
//! Event handlers that run bound callbacks over live instances in priority
//! order.
//!
//! Each handler keeps its own active set and pending queue. The registry
//! feeds the pending queue on every spawn and kill; the handler folds it
//! into the active set before and after each run.

mod context;
mod handler;
pub(crate) mod pending;

pub use context::Context;
pub use handler::{Callback, Handler, PriorityFn, Released};
pub use pending::PendingOp;
