//! FanoutConfig - Config Loader output
//!
//! Describes the eviction policy and the sinks to open at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete fanout configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FanoutConfig {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// What happens to a sink that fails a write
    #[serde(default)]
    pub eviction: EvictionPolicy,

    /// Sinks opened at startup
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

/// Treatment of a sink evicted after a failed write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Remove and drop the sink without calling `close`
    #[default]
    Detach,
    /// Remove the sink and call `close` on it
    Close,
}

/// Sink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink name
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

impl SinkConfig {
    pub fn new(name: impl Into<String>, sink_type: SinkType) -> Self {
        Self {
            name: name.into(),
            sink_type,
            params: HashMap::new(),
        }
    }

    /// Builder-style parameter setter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Tracing log output
    Log,
    /// File output
    File,
    /// Network output (TCP)
    Network,
    /// Process stdout
    Stdout,
}

impl SinkType {
    /// Parameters that must be present for this sink type
    pub fn required_params(self) -> &'static [&'static str] {
        match self {
            Self::Log | Self::Stdout => &[],
            Self::File => &["path"],
            Self::Network => &["addr"],
        }
    }
}
