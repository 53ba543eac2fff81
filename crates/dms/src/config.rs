//! Capture session configuration

use serde::{Deserialize, Serialize};

/// Capture session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Mirror extracted frames horizontally (front sensor convention)
    pub mirror: bool,

    /// Verdicts buffered between submission tasks and the presenter
    pub result_channel_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mirror: true,
            result_channel_capacity: 8,
        }
    }
}

impl SessionConfig {
    /// Config for a rear-facing or already-mirrored sensor
    pub fn unmirrored() -> Self {
        Self {
            mirror: false,
            ..Default::default()
        }
    }
}
