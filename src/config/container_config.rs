use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lower bound for the capacity hint
pub const MIN_CAPACITY: usize = 8;

/// Service container configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// Capacity hint; bindings and instances are pre-sized to four times this.
    pub capacity: usize,
    /// Upper bound on user parameters handed to a single `make`.
    pub max_user_params: usize,
}

/// Partial container configuration for loading from files
#[derive(Deserialize, Debug, Default)]
pub struct PartialContainerConfig {
    pub capacity: Option<usize>,
    pub max_user_params: Option<usize>,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            max_user_params: default_max_user_params(),
        }
    }
}

impl ContainerConfig {
    /// Create ContainerConfig from environment variables and file config
    pub fn from_env_or_file(
        file_config: Option<PartialContainerConfig>,
        env_map: &HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let capacity = match env_map.get("BINDERY_CAPACITY") {
            Some(value) => parse_usize("BINDERY_CAPACITY", value)?,
            None => file_config
                .as_ref()
                .and_then(|c| c.capacity)
                .unwrap_or_else(default_capacity),
        };

        let max_user_params = match env_map.get("BINDERY_MAX_USER_PARAMS") {
            Some(value) => parse_usize("BINDERY_MAX_USER_PARAMS", value)?,
            None => file_config
                .as_ref()
                .and_then(|c| c.max_user_params)
                .unwrap_or_else(default_max_user_params),
        };

        Ok(Self {
            capacity,
            max_user_params,
        })
    }

    /// Capacity actually used for pre-sizing, never below [`MIN_CAPACITY`].
    pub fn effective_capacity(&self) -> usize {
        self.capacity.max(MIN_CAPACITY)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_user_params == 0 {
            return Err(ConfigError::Invalid {
                key: "container.max_user_params".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        reason: format!("'{}' is not a non-negative integer", value),
    })
}

// Default functions
fn default_capacity() -> usize {
    64
}

fn default_max_user_params() -> usize {
    255
}
