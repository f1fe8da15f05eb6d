pub mod config;
pub mod errors;
pub mod infrastructure;
pub mod logging;

// Re-export commonly used items for convenience
pub use config::{AppConfig, ContainerConfig};
pub use errors::{AppError, ConfigError, ContainerError};
pub use infrastructure::container::{
    Arguments, Binding, ContainerExt, ContainerStats, Contract, Dependency, Describe, Dispose,
    Instance, Param, Recipe, RecipeBuilder, Resolver, ServiceContainer, ServiceKey,
    ServiceLifetime, Source, TypeDescriptor, TypeKind,
};
pub use infrastructure::container::ext::FactoryError;
pub use infrastructure::{App, Application, BootstrapAgent, Lifecycle, Provider, ProviderList};
