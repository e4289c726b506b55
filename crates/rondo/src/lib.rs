//! # RONDO
//!
//! The main crate, wiring the core engine into a frame loop.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          GameLoop                            │
//! │                                                              │
//! │   Registry ──spawn/kill──> pending ops ──> step Handler      │
//! │      │                          └────────> draw Handler      │
//! │      │                                                       │
//! │      └── templates, instance table, ctor/dtor hooks          │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `game_loop`: Frame orchestration and timing
//! - `objects`: The player, enemy and wall example objects

pub mod game_loop;
pub mod objects;

// Re-export the engine
pub use rondo_core as core;

// Re-export commonly used types
pub use game_loop::{FrameStats, FrameStatsAccumulator, GameLoop, ShutdownReport};
pub use rondo_core::{
    Context, EngineConfig, EngineError, EngineResult, Handler, HookError, HookResult, InstanceId,
    Registry, TemplateIndex,
};
