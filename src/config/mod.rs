pub mod app_config;
pub mod container_config;
pub mod loader;
pub mod logging_config;

// Re-export commonly used types
pub use app_config::{AppConfig, CONFIG_FILE_NAME};
pub use container_config::ContainerConfig;
pub use loader::ConfigLoader;
pub use logging_config::LoggingSection;
