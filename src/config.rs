//! Engine configuration.
//!
//! With the `config` feature the configuration can be deserialized, e.g. from
//! a JSON document shipped alongside an application:
//!
//! ```rust,ignore
//! let config = beanwire::EngineConfig::from_json_str(r#"{ "max_depth": 64 }"#)?;
//! ```

#[cfg(feature = "config")]
use serde::Deserialize;

#[cfg(feature = "config")]
use crate::error::{DiError, DiResult};

/// Default limit on nested recipe resolutions.
///
/// Every level of nesting costs a handful of stack frames. The default fits
/// the 2 MiB stack of a spawned thread in an unoptimized build; raise it only
/// for threads with larger stacks.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Tunables of the resolution engine.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct EngineConfig {
    /// Maximum nesting of recipe resolutions before a request fails,
    /// counted across passes nested inside callbacks
    pub max_depth: usize,
    /// Postpone the initialization of a bean whose initialization
    /// dependencies are still being created, instead of failing the cycle
    pub defer_initialization: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_depth: DEFAULT_MAX_DEPTH,
            defer_initialization: true,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    pub fn defer_initialization(mut self, enabled: bool) -> Self {
        self.defer_initialization = enabled;
        self
    }

    /// Parses a configuration from JSON; missing fields take their defaults.
    #[cfg(feature = "config")]
    pub fn from_json_str(json: &str) -> DiResult<Self> {
        let config: EngineConfig = serde_json::from_str(json)
            .map_err(|e| DiError::InvalidRecipe(format!("invalid engine configuration: {}", e)))?;
        let depth = config.max_depth;
        Ok(config.max_depth(depth))
    }
}
