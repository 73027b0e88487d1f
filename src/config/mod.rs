mod settings;

use config::{Config, ConfigError, Environment, File};

use settings::PartialSettings;

pub use settings::{ClientSettings, HeartbeatSettings, ServerSettings, Settings};

/// Prefix of environment variables that override configuration, e.g.
/// `MSGBROKER__SERVER__PORT=2000`.
pub const ENV_PREFIX: &str = "MSGBROKER";

/// Loads the configuration from the default file and environment variables
/// Merges the configuration with default values
/// Returns a `Settings` struct containing the server, heartbeat and client configurations,
/// or an error if a merged value is unusable
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    partial.merge(Settings::default()).validate()
}
