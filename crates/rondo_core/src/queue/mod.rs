//! # Queues
//!
//! The ordered ring backing every handler's active set.
//!
//! ## Design Philosophy
//!
//! - One owned slot array, addressed by modular arithmetic
//! - Callers see logical positions only, never slot indices
//! - Capacity doubles on demand and never shrinks

mod ring;

pub use ring::{OrderedRing, RingError, RingTable};
