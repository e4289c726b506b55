//! # Engine Configuration
//!
//! Sizing knobs for the registry and its handlers. Loaded once at startup,
//! either from code or from a TOML file.
//!
//! ```toml
//! initial_instance_capacity = 1024
//! handler_queue_capacity = 64
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Sizing configuration for a [`Registry`](crate::Registry).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Starting number of instance table slots (slot 0 is reserved).
    pub initial_instance_capacity: usize,
    /// The instance table never grows past this many slots.
    pub max_instance_capacity: u64,
    /// Starting slot count of each handler's active set.
    pub handler_queue_capacity: usize,
    /// Starting capacity of each handler's pending queue.
    pub pending_queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_instance_capacity: 0xffff,
            max_instance_capacity: 1 << 62,
            handler_queue_capacity: 128,
            pending_queue_capacity: 128,
        }
    }
}

impl EngineConfig {
    /// Small footprint for tools and tests that spawn a handful of instances.
    #[must_use]
    pub const fn compact() -> Self {
        Self {
            initial_instance_capacity: 16,
            max_instance_capacity: 1 << 62,
            handler_queue_capacity: 8,
            pending_queue_capacity: 8,
        }
    }

    /// Parses a configuration from TOML text. Missing keys take defaults.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] if the text does not parse or
    /// the values fail [`validate`](Self::validate).
    pub fn from_toml_str(text: &str) -> EngineResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] if the file cannot be read or
    /// its contents are invalid.
    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            EngineError::InvalidConfig(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks that every capacity is usable.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] naming the first bad value.
    pub fn validate(&self) -> EngineResult<()> {
        if self.initial_instance_capacity == 0 {
            return Err(EngineError::InvalidConfig(
                "initial_instance_capacity must be greater than zero".to_string(),
            ));
        }
        if self.initial_instance_capacity as u64 > self.max_instance_capacity {
            return Err(EngineError::InvalidConfig(format!(
                "initial_instance_capacity {} exceeds max_instance_capacity {}",
                self.initial_instance_capacity, self.max_instance_capacity
            )));
        }
        if self.handler_queue_capacity == 0 {
            return Err(EngineError::InvalidConfig(
                "handler_queue_capacity must be greater than zero".to_string(),
            ));
        }
        if self.pending_queue_capacity == 0 {
            return Err(EngineError::InvalidConfig(
                "pending_queue_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(EngineConfig::default().validate().is_ok());
        assert!(EngineConfig::compact().validate().is_ok());
        assert_eq!(EngineConfig::default().initial_instance_capacity, 0xffff);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = EngineConfig::from_toml_str("handler_queue_capacity = 4\n").unwrap();
        assert_eq!(config.handler_queue_capacity, 4);
        assert_eq!(config.pending_queue_capacity, 128);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = EngineConfig::from_toml_str("pending_queue_capacity = 0").unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));

        let err = EngineConfig::from_toml_str(
            "initial_instance_capacity = 64\nmax_instance_capacity = 32",
        )
        .unwrap_err();
        assert!(err.to_string().contains("exceeds"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(EngineConfig::from_toml_str("worker_threads = 4").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = EngineConfig::load("/nonexistent/rondo.toml").unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
