//! # AIMS Configuration
//!
//! Typed settings for the metrics updater, the score aggregator and logging,
//! loaded from `config.toml` and `AIMS__`-prefixed environment variables.

use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_tracing;
pub use settings::{AggregatorSettings, Config, LoggingSettings, UpdaterSettings};

/// Loads and validates the configuration from `path`.
///
/// The file is optional. Any value can be overridden from the environment,
/// e.g. `AIMS__UPDATER__MAX_ATTEMPTS=20`.
pub fn load_config_from(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path.as_ref()).required(false))
        .add_source(
            config::Environment::with_prefix("AIMS")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;

    Ok(config)
}
