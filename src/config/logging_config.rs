use crate::errors::ConfigError;
use crate::logging::LogFormat;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Logging section of the application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Default filter directive, overridden by `RUST_LOG` when set.
    pub level: String,
    pub format: LogFormat,
}

/// Partial logging configuration for loading from files
#[derive(Deserialize, Debug, Default)]
pub struct PartialLoggingSection {
    pub level: Option<String>,
    pub format: Option<LogFormat>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::Pretty,
        }
    }
}

impl LoggingSection {
    pub fn from_env_or_file(
        file_config: Option<PartialLoggingSection>,
        env_map: &HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let level = env_map
            .get("BINDERY_LOG_LEVEL")
            .cloned()
            .or_else(|| file_config.as_ref().and_then(|c| c.level.clone()))
            .unwrap_or_else(default_level);

        let format = match env_map.get("BINDERY_LOG_FORMAT") {
            Some(value) => value.parse()?,
            None => file_config
                .as_ref()
                .and_then(|c| c.format)
                .unwrap_or(LogFormat::Pretty),
        };

        Ok(Self { level, format })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let level = self.level.to_ascii_lowercase();
        if !LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::Invalid {
                key: "logging.level".to_string(),
                reason: format!("unknown level '{}', expected one of {}", self.level, LEVELS.join(", ")),
            });
        }
        Ok(())
    }
}

fn default_level() -> String {
    "info".to_string()
}
