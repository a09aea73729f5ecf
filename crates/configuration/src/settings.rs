use crate::error::ConfigError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// The root configuration structure for the entire application.
///
/// Every section is optional in `config.toml`; missing sections fall back to
/// their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub updater: UpdaterSettings,
    #[serde(default)]
    pub aggregator: AggregatorSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Config {
    /// Checks the cross-field rules that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.updater.validate()?;
        self.aggregator.validate()?;
        Ok(())
    }
}

/// Retry budget of the optimistic recompute loop.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpdaterSettings {
    /// Compare-and-swap attempts per recompute before giving up.
    pub max_attempts: u32,
    /// Delay before the second attempt. Doubles on every further conflict.
    pub base_backoff_ms: u64,
    /// Upper bound of a single backoff delay.
    pub max_backoff_ms: u64,
    /// Randomise each delay within `[0, delay]` so colliding writers spread out.
    pub jitter: bool,
}

impl UpdaterSettings {
    pub fn base_backoff(&self) -> Duration {
        Duration::from_millis(self.base_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "updater.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.base_backoff_ms > self.max_backoff_ms {
            return Err(ConfigError::ValidationError(format!(
                "updater.base_backoff_ms ({}) exceeds updater.max_backoff_ms ({})",
                self.base_backoff_ms, self.max_backoff_ms
            )));
        }
        Ok(())
    }
}

impl Default for UpdaterSettings {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_backoff_ms: 5,
            max_backoff_ms: 500,
            jitter: true,
        }
    }
}

/// Parameters of the composite AIMS score.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AggregatorSettings {
    /// Reports required before any score field is filled in.
    pub min_reports: usize,
    pub weight_accuracy: Decimal,
    pub weight_return: Decimal,
    pub weight_target: Decimal,
}

impl AggregatorSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        let weights = [
            ("weight_accuracy", self.weight_accuracy),
            ("weight_return", self.weight_return),
            ("weight_target", self.weight_target),
        ];
        for (name, weight) in weights {
            if weight.is_sign_negative() {
                return Err(ConfigError::ValidationError(format!(
                    "aggregator.{name} must not be negative"
                )));
            }
        }
        let total = self.weight_accuracy + self.weight_return + self.weight_target;
        if total != Decimal::ONE {
            return Err(ConfigError::ValidationError(format!(
                "aggregator weights must sum to 1, got {total}"
            )));
        }
        Ok(())
    }
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            min_reports: 5,
            weight_accuracy: dec!(0.5),
            weight_return: dec!(0.3),
            weight_target: dec!(0.2),
        }
    }
}

/// Where and how verbosely the binary logs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive; `RUST_LOG` takes precedence when set.
    pub level: String,
    /// When set, logs are also written to a daily-rolling file in this directory.
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
            file_prefix: "aims.log".to_string(),
        }
    }
}
