//! Configuration loading.
//!
//! Sources, later ones overriding earlier ones:
//! - built-in defaults
//! - `config/default.*` (optional), or an explicit file given on the command line
//! - environment variables prefixed `ECHOCHAT_`, with `__` between nested keys
//!   (for example `ECHOCHAT_SERVER__PORT=9000`)

mod settings;

use config::{Config, ConfigError, Environment, File};

use settings::PartialSettings;

pub use settings::{BrokerSettings, LoggingSettings, ServerSettings, Settings};

pub const ENV_PREFIX: &str = "ECHOCHAT";

/// Loads the configuration from the default file and environment variables,
/// merged over the defaults.
pub fn load_config() -> Result<Settings, ConfigError> {
    load(File::with_name("config/default").required(false))
}

/// Like [`load_config`], but reads the given file, which must exist.
pub fn load_config_from(path: &str) -> Result<Settings, ConfigError> {
    load(File::with_name(path).required(true))
}

fn load(file: File<config::FileSourceFile, config::FileFormat>) -> Result<Settings, ConfigError> {
    let builder = Config::builder().add_source(file).add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(partial.merge_over(Settings::default()))
}
