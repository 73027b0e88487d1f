use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;

/// Top-level configuration settings for the application.
///
/// Includes settings for the broker's listening address, the heartbeat
/// subsystem and the peer-side client.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server: ServerSettings,
    pub heartbeat: HeartbeatSettings,
    pub client: ClientSettings,
}

/// Configuration settings for the server.
///
/// Defines the host and port the broker binds to, and that clients dial by default.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration settings for liveness probing.
///
/// Heartbeating is off unless `enabled` is set. `pong_port` is where a peer's
/// pong responder listens; probes go out every `interval_ms`, each waiting up
/// to `timeout_ms` for its reply. The client-side pinger sends its first probe
/// after `warmup_ms`.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct HeartbeatSettings {
    pub enabled: bool,
    pub pong_port: u16,
    pub interval_ms: u64,
    pub timeout_ms: u64,
    pub warmup_ms: u64,
}

impl HeartbeatSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn warmup(&self) -> Duration {
        Duration::from_millis(self.warmup_ms)
    }
}

/// Configuration settings for the peer-side client.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub ack_timeout_ms: u64,
}

impl ClientSettings {
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled using defaults.
#[derive(Debug, Deserialize, Default)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub heartbeat: Option<PartialHeartbeatSettings>,
    pub client: Option<PartialClientSettings>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialHeartbeatSettings {
    pub enabled: Option<bool>,
    pub pong_port: Option<u16>,
    pub interval_ms: Option<u64>,
    pub timeout_ms: Option<u64>,
    pub warmup_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialClientSettings {
    pub ack_timeout_ms: Option<u64>,
}

impl Settings {
    /// Reject values the runtime cannot run with.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.heartbeat.interval_ms == 0 {
            return Err(ConfigError::Message(
                "heartbeat.interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(self)
    }
}

impl PartialSettings {
    /// Fill every missing value from `defaults`.
    pub fn merge(self, defaults: Settings) -> Settings {
        let server = self.server.unwrap_or_default();
        let heartbeat = self.heartbeat.unwrap_or_default();
        let client = self.client.unwrap_or_default();

        Settings {
            server: ServerSettings {
                host: server.host.unwrap_or(defaults.server.host),
                port: server.port.unwrap_or(defaults.server.port),
            },
            heartbeat: HeartbeatSettings {
                enabled: heartbeat.enabled.unwrap_or(defaults.heartbeat.enabled),
                pong_port: heartbeat.pong_port.unwrap_or(defaults.heartbeat.pong_port),
                interval_ms: heartbeat
                    .interval_ms
                    .unwrap_or(defaults.heartbeat.interval_ms),
                timeout_ms: heartbeat.timeout_ms.unwrap_or(defaults.heartbeat.timeout_ms),
                warmup_ms: heartbeat.warmup_ms.unwrap_or(defaults.heartbeat.warmup_ms),
            },
            client: ClientSettings {
                ack_timeout_ms: client
                    .ack_timeout_ms
                    .unwrap_or(defaults.client.ack_timeout_ms),
            },
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 1373,
        }
    }
}

impl Default for HeartbeatSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            pong_port: 1500,
            interval_ms: 10_000,
            timeout_ms: 10_000,
            warmup_ms: 1_000,
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            ack_timeout_ms: 10_000,
        }
    }
}

/// Provides default values for `Settings`.
///
/// Ensures the application has sensible defaults if no configuration is provided.
impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            heartbeat: HeartbeatSettings::default(),
            client: ClientSettings::default(),
        }
    }
}
