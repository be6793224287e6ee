//! Plugin configuration (`plugins/SpeedSwap/config.json`).

use serde::{Deserialize, Serialize};
use tracing::warn;

/// How participant disconnects are noticed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectDetection {
    /// Liveness check on every countdown tick (up to one second late).
    #[default]
    Poll,
    /// Also stop as soon as a participant quit event arrives.
    Event,
}

/// Arrival point for end crossings out of a primary world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndSpawn {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
}

impl Default for EndSpawn {
    fn default() -> Self {
        Self {
            x: 100.5,
            y: 50.0,
            z: 0.5,
            yaw: 90.0,
            pitch: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwapConfig {
    /// Seconds between swaps.
    pub period_seconds: u32,
    /// World names are `<prefix>_<owner>[_nether|_the_end]`.
    pub world_prefix: String,
    pub portal_search_radius: i32,
    /// Horizontal scale between primary and nether coordinates.
    pub nether_scale: f64,
    pub end_spawn: EndSpawn,
    /// Tell each participant whose state they received.
    pub announce_swaps: bool,
    pub disconnect_detection: DisconnectDetection,
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            period_seconds: 60,
            world_prefix: "SS".into(),
            portal_search_radius: 128,
            nether_scale: 8.0,
            end_spawn: EndSpawn::default(),
            announce_swaps: true,
            disconnect_detection: DisconnectDetection::Poll,
        }
    }
}

impl SwapConfig {
    /// Build a config from JSON, falling back to defaults for anything unusable.
    pub fn from_json(value: serde_json::Value) -> Self {
        match serde_json::from_value::<SwapConfig>(value) {
            Ok(config) => config.validated(),
            Err(e) => {
                warn!("Invalid SpeedSwap config, using defaults: {e}");
                Self::default()
            }
        }
    }

    fn validated(mut self) -> Self {
        let defaults = Self::default();
        if self.period_seconds == 0 {
            warn!("period_seconds must be positive, using {}", defaults.period_seconds);
            self.period_seconds = defaults.period_seconds;
        }
        let prefix = self.world_prefix.trim();
        if prefix.is_empty() || prefix.contains(char::is_whitespace) {
            warn!("Invalid world_prefix {:?}, using {:?}", self.world_prefix, defaults.world_prefix);
            self.world_prefix = defaults.world_prefix;
        }
        if !(self.nether_scale.is_finite() && self.nether_scale > 0.0) {
            warn!("nether_scale must be positive, using {}", defaults.nether_scale);
            self.nether_scale = defaults.nether_scale;
        }
        if self.portal_search_radius < 0 {
            self.portal_search_radius = defaults.portal_search_radius;
        }
        self
    }
}
