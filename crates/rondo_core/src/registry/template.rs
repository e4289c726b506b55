//! # Templates
//!
//! Static descriptors instances are spawned from.

use super::ids::TemplateIndex;
use super::instance::Instance;
use crate::error::HookResult;

/// Constructor or destructor run against a single instance.
pub type Hook = fn(&mut Instance) -> HookResult;

/// A registered template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Template {
    index: TemplateIndex,
    name: String,
    size: usize,
}

impl Template {
    pub(crate) fn new(index: TemplateIndex, name: String, size: usize) -> Self {
        Self { index, name, size }
    }

    /// Returns the template's index.
    #[inline]
    #[must_use]
    pub const fn index(&self) -> TemplateIndex {
        self.index
    }

    /// Returns the display name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the per-instance state size in bytes.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }
}
