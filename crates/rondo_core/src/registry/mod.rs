//! # Registry
//!
//! Templates, instances and their lifecycle.
//!
//! ## Design Philosophy
//!
//! - Ids are handed out monotonically and never reused
//! - An id indexes its slot in the instance table directly
//! - State is an opaque zeroed byte block, viewed through `bytemuck`
//! - Spawn and kill only notify handlers; they never touch an active set

mod ids;
mod instance;
mod lifecycle;
mod table;
mod template;

pub use ids::{InstanceId, TemplateIndex};
pub use instance::{Instance, StateBlock};
pub use lifecycle::{Registry, RegistryId, TeardownReport};
pub use template::{Hook, Template};
