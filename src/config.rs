// Taguchi Edge - Telemetry ingestion and S/N analysis engine
//
// Licensed under the AGPL-3.0 license.

//! Configuration types for the ingestion engine

use serde::{Deserialize, Serialize};

/// Declaration of a single sensor channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSpec {
    /// Channel name (final topic segment)
    pub name: String,

    /// Engineering unit, informational only
    pub unit: String,
}

impl ChannelSpec {
    /// Create a new channel declaration
    pub fn new(name: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
        }
    }
}

/// Engine-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Topic namespace prefix (default: "jetsion")
    pub namespace: String,

    /// Device identifier scoping the topic space
    pub device_id: String,

    /// Declared sensor channels; samples for anything else are rejected
    pub channels: Vec<ChannelSpec>,

    /// Capacity of the per-channel display buffer (default: 100)
    pub display_capacity: usize,

    /// Capacity of the per-channel analysis buffer feeding S/N (default: 1000)
    pub analysis_capacity: usize,

    /// Capacity of the per-channel S/N history (default: 100)
    pub sn_history_capacity: usize,

    /// Minimum analysis samples before S/N is computed (default: 10)
    pub sn_min_samples: usize,

    /// Trailing window width of the smoothing filter (default: 3)
    pub smoothing_window: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            namespace: "jetsion".to_string(),
            device_id: "device001".to_string(),
            channels: vec![
                ChannelSpec::new("pressure", "bar"),
                ChannelSpec::new("vibration", "mm/s"),
                ChannelSpec::new("rpm", "RPM"),
                ChannelSpec::new("current", "A"),
            ],
            display_capacity: 100,
            analysis_capacity: 1000,
            sn_history_capacity: 100,
            sn_min_samples: 10,
            smoothing_window: 3,
        }
    }
}

impl EngineConfig {
    /// Create a configuration for a specific device
    pub fn for_device(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            ..Default::default()
        }
    }

    /// Create a configuration with a custom channel set
    pub fn with_channels(channels: Vec<ChannelSpec>) -> Self {
        Self {
            channels,
            ..Default::default()
        }
    }

    /// Look up a declared channel by name
    pub fn channel(&self, name: &str) -> Option<&ChannelSpec> {
        self.channels.iter().find(|c| c.name == name)
    }
}
