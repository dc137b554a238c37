//! Element configuration.

use crate::observability::TracingConfig;

/// Configuration for an [`AutoConvert`](crate::autoconvert::AutoConvert)
/// element.
#[derive(Debug, Clone)]
pub struct AutoConvertConfig {
    /// Element name, used in logs and metric labels.
    pub name: String,

    /// Longest chain of stages tried for one route.
    pub max_chain_length: usize,

    /// Span and probe logging.
    pub tracing: TracingConfig,
}

impl Default for AutoConvertConfig {
    fn default() -> Self {
        Self {
            name: "autoconvert".to_string(),
            max_chain_length: 4,
            tracing: TracingConfig::default(),
        }
    }
}

impl AutoConvertConfig {
    /// Create a config with the given element name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Create a config for debugging: every span and probe is logged.
    pub fn verbose(name: impl Into<String>) -> Self {
        Self {
            tracing: TracingConfig::all(),
            ..Self::new(name)
        }
    }

    /// Set the longest chain tried per route.
    pub fn with_max_chain_length(mut self, max_chain_length: usize) -> Self {
        self.max_chain_length = max_chain_length;
        self
    }

    /// Set the tracing configuration.
    pub fn with_tracing(mut self, tracing: TracingConfig) -> Self {
        self.tracing = tracing;
        self
    }
}
