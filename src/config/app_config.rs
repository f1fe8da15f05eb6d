use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::PathBuf};

use super::{
    container_config::{ContainerConfig, PartialContainerConfig},
    loader::ConfigLoader,
    logging_config::{LoggingSection, PartialLoggingSection},
};

// Configuration file name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "bindery.toml";

// Environment variables honoured on top of the file
pub const ENV_KEYS: [&str; 4] = [
    "BINDERY_CAPACITY",
    "BINDERY_MAX_USER_PARAMS",
    "BINDERY_LOG_LEVEL",
    "BINDERY_LOG_FORMAT",
];

/// Main Application Configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub container: ContainerConfig,
    pub logging: LoggingSection,
}

/// Partial Application Configuration for loading from files
#[derive(Deserialize, Debug, Default)]
pub struct PartialAppConfig {
    container: Option<PartialContainerConfig>,
    logging: Option<PartialLoggingSection>,
}

impl AppConfig {
    /// Load configuration from `bindery.toml` (if present) and environment
    pub fn load() -> Result<Self, ConfigError> {
        ConfigLoader::new().load_config()
    }

    /// Load configuration from an explicit file and environment
    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        ConfigLoader::with_path(path).load_config()
    }

    /// Create AppConfig from partial config and environment
    pub fn from_partial_and_env(
        partial: Option<PartialAppConfig>,
        env_map: HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let partial = partial.unwrap_or_default();

        let container = ContainerConfig::from_env_or_file(partial.container, &env_map)?;
        let logging = LoggingSection::from_env_or_file(partial.logging, &env_map)?;

        let config = AppConfig { container, logging };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.container.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Render as TOML, the same shape the loader accepts
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid {
            key: "config".to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogFormat;

    #[test]
    fn test_from_partial_defaults() {
        let config = AppConfig::from_partial_and_env(None, HashMap::new()).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_partial_from_toml() {
        let partial: PartialAppConfig = toml::from_str(
            r#"
            [container]
            capacity = 128

            [logging]
            format = "compact"
            "#,
        )
        .unwrap();

        let config = AppConfig::from_partial_and_env(Some(partial), HashMap::new()).unwrap();
        assert_eq!(config.container.capacity, 128);
        assert_eq!(config.container.max_user_params, 255);
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_to_toml_round_trips_through_partial() {
        let text = AppConfig::default().to_toml().unwrap();
        assert!(text.contains("[container]"));
        let partial: PartialAppConfig = toml::from_str(&text).unwrap();
        let config = AppConfig::from_partial_and_env(Some(partial), HashMap::new()).unwrap();
        assert_eq!(config, AppConfig::default());
    }
}
