//! Configuration loading and representation.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Runtime settings for the stock services.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StockroomConfig {
    /// Prefix of generated warehouse order numbers.
    pub order_number_prefix: String,
    /// Re-runs of a unit of work after an optimistic-concurrency conflict.
    pub conflict_retries: u32,
    /// `tracing` filter directive handed to the subscriber.
    pub log_filter: String,
}

impl Default for StockroomConfig {
    fn default() -> Self {
        Self {
            order_number_prefix: "WO".to_string(),
            conflict_retries: 3,
            log_filter: "info".to_string(),
        }
    }
}

impl StockroomConfig {
    /// Defaults, then `config/stockroom.toml` (optional), then `STOCKROOM_*` env vars.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_builder(
            Config::builder()
                .add_source(File::with_name("config/stockroom").required(false))
                .add_source(Environment::with_prefix("STOCKROOM")),
        )
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let settings = Config::builder()
            .set_default("order_number_prefix", defaults.order_number_prefix)?
            .set_default("conflict_retries", i64::from(defaults.conflict_retries))?
            .set_default("log_filter", defaults.log_filter)?
            .add_source(builder.build()?)
            .build()?;

        let config: StockroomConfig = settings.try_deserialize()?;
        if config.order_number_prefix.trim().is_empty() {
            return Err(ConfigError::Message(
                "order_number_prefix cannot be empty".to_string(),
            ));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_sources() {
        let config = StockroomConfig::from_builder(Config::builder()).unwrap();
        assert_eq!(config, StockroomConfig::default());
    }

    #[test]
    fn overrides_replace_defaults() {
        let builder = Config::builder()
            .set_override("order_number_prefix", "GUD")
            .unwrap()
            .set_override("conflict_retries", 7i64)
            .unwrap();
        let config = StockroomConfig::from_builder(builder).unwrap();
        assert_eq!(config.order_number_prefix, "GUD");
        assert_eq!(config.conflict_retries, 7);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn empty_prefix_is_rejected() {
        let builder = Config::builder().set_override("order_number_prefix", " ").unwrap();
        assert!(StockroomConfig::from_builder(builder).is_err());
    }
}
