use serde::Deserialize;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid tick_rate {0}: must be between 1 and 1000")]
    TickRate(u32),
}

/// Game ticks per second when `[server] tick_rate` is absent.
pub const DEFAULT_TICK_RATE: u32 = 20;
/// Highest tick rate that still leaves a whole millisecond per tick.
pub const MAX_TICK_RATE: u32 = 1000;

#[derive(Debug, Deserialize)]
pub struct HostConfig {
    pub server: ServerSection,
    pub world: WorldSection,
    pub logging: LoggingSection,
    #[serde(default)]
    pub permissions: PermissionsSection,
}

#[derive(Debug, Deserialize)]
pub struct ServerSection {
    pub name: String,
    /// Game ticks per second. Plugin task delays are counted in these ticks.
    #[serde(default = "default_tick_rate")]
    pub tick_rate: u32,
}

fn default_tick_rate() -> u32 {
    DEFAULT_TICK_RATE
}

#[derive(Debug, Deserialize)]
pub struct WorldSection {
    /// The shared default world players join into.
    pub name: String,
    pub seed: i64,
    /// Maximum number of loaded worlds, including the default ones. None = unlimited.
    #[serde(default)]
    pub max_worlds: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    pub level: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PermissionsSection {
    /// Player names granted every permission.
    #[serde(default)]
    pub ops: Vec<String>,
}

impl HostConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        if !(1..=MAX_TICK_RATE).contains(&config.server.tick_rate) {
            return Err(ConfigError::TickRate(config.server.tick_rate));
        }
        Ok(config)
    }

    /// Milliseconds between game ticks. Never zero for a parsed config.
    pub fn tick_millis(&self) -> u64 {
        1000 / u64::from(self.server.tick_rate.clamp(1, MAX_TICK_RATE))
    }
}
