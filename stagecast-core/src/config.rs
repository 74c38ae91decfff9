use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub access: AccessConfig,
    pub room: RoomConfig,
    pub hub: HubConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub http_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            http_port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

/// Access-code issuance and lifecycle settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Width of the numeric code in digits (clamped to 1..=19 at issuance)
    pub code_length: usize,
    /// Code lifetime from issuance
    pub code_ttl_secs: u64,
    /// Window after expiry/revocation before forced disconnect
    pub grace_period_secs: u64,
    /// Simultaneous connections allowed per code
    pub max_concurrent_per_code: u32,
    /// Generation attempts before giving up with `ExhaustedCodeSpace`
    pub issue_attempts: u32,
    /// Background sweep cadence
    pub sweep_interval_secs: u64,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            code_length: 6,
            code_ttl_secs: 900,
            grace_period_secs: 30,
            max_concurrent_per_code: 3,
            issue_attempts: 128,
            sweep_interval_secs: 5,
        }
    }
}

impl AccessConfig {
    #[must_use]
    pub fn code_ttl(&self) -> Duration {
        Duration::from_secs(self.code_ttl_secs)
    }

    #[must_use]
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }

    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// Messages retained in the in-memory transcript window per room
    pub chat_window: usize,
    /// Maximum chat message length in characters
    pub max_chat_len: usize,
    /// Rooms a single studio may own
    pub max_rooms_per_studio: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            chat_window: 100,
            max_chat_len: 500,
            max_rooms_per_studio: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Bounded outbound queue per subscriber; a full queue drops the subscriber
    pub subscriber_queue: usize,
    /// Minimum interval between reactions per (room, author)
    pub reaction_cooldown_ms: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            subscriber_queue: 64,
            reaction_cooldown_ms: 1000,
        }
    }
}

impl HubConfig {
    #[must_use]
    pub fn reaction_cooldown(&self) -> Duration {
        Duration::from_millis(self.reaction_cooldown_ms)
    }
}

impl Config {
    /// Load configuration from an optional file plus `STAGECAST_` environment
    /// overrides (e.g. `STAGECAST_SERVER__HTTP_PORT=9090`).
    pub fn load(path: Option<&Path>) -> std::result::Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        builder
            .add_source(Environment::with_prefix("STAGECAST").separator("__"))
            .build()?
            .try_deserialize()
    }
}
