use std::{collections::HashMap, env, fs, path::PathBuf};
use crate::errors::ConfigError;

use super::app_config::{AppConfig, PartialAppConfig, CONFIG_FILE_NAME, ENV_KEYS};

/// Configuration loader responsible for loading config from files and environment
pub struct ConfigLoader {
    path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a loader that looks for `bindery.toml` in the working directory
    pub fn new() -> Self {
        Self { path: None }
    }

    /// Create a loader for an explicit file; a missing file is an error
    pub fn with_path(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    /// Load complete application configuration
    pub fn load_config(&self) -> Result<AppConfig, ConfigError> {
        let partial_config = match &self.path {
            Some(path) => Some(self.load_partial_config(path)?),
            None => {
                let default_path = PathBuf::from(CONFIG_FILE_NAME);
                if default_path.exists() {
                    Some(self.load_partial_config(&default_path)?)
                } else {
                    tracing::debug!("No {} found, using defaults", CONFIG_FILE_NAME);
                    None
                }
            }
        };

        let env_map = self.collect_env_vars();
        AppConfig::from_partial_and_env(partial_config, env_map)
    }

    /// Load partial configuration from TOML file
    fn load_partial_config(&self, config_path: &PathBuf) -> Result<PartialAppConfig, ConfigError> {
        let content = fs::read_to_string(config_path).map_err(|e| {
            ConfigError::FileRead(config_path.to_string_lossy().to_string(), e)
        })?;

        let partial_config: PartialAppConfig = toml::from_str(&content)?;
        tracing::debug!("Loaded config file: {:?}", config_path);
        Ok(partial_config)
    }

    /// Collect relevant environment variables
    fn collect_env_vars(&self) -> HashMap<String, String> {
        let mut env_map = HashMap::new();
        for key in &ENV_KEYS {
            if let Ok(value) = env::var(key) {
                env_map.insert(key.to_string(), value);
            }
        }
        env_map
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
