//! # Identifiers
//!
//! Instances are addressed by a monotonically increasing id that is never
//! reused. Templates are addressed by a caller-chosen 16-bit index.

use std::fmt;

/// Unique identifier of an instance.
///
/// Ids are handed out in increasing order starting at 1 and are never
/// reused within one registry, so a stale id can only ever point at a dead
/// slot. Id 0 is reserved as "no instance".
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct InstanceId(u64);

impl InstanceId {
    /// The reserved "no instance" id.
    pub const NONE: Self = Self(0);

    /// Wraps a raw id, for lookups of ids obtained elsewhere.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Checks if this is the reserved id.
    #[inline]
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::NONE
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Index of a registered template.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct TemplateIndex(pub u16);

impl fmt::Display for TemplateIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u16> for TemplateIndex {
    fn from(index: u16) -> Self {
        Self(index)
    }
}
