use crate::infrastructure::container::ServiceKey;
use crate::infrastructure::Lifecycle;
use thiserror::Error;

/// Failures raised by the service container.
///
/// All of these are configuration or programming errors. The container never
/// retries or recovers from them; a failed `make` leaves bindings, tags and
/// cached instances untouched.
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("Service '{service}' is already bound or has a cached instance")]
    DuplicateBinding { service: ServiceKey },

    #[error("Type '{concrete}' cannot be constructed by the container ({kind})")]
    UnconstructibleType {
        concrete: ServiceKey,
        kind: &'static str,
    },

    #[error("Tag '{0}' does not exist")]
    UnknownTag(String),

    #[error("Service '{service}' is bound as transient and cannot hold a singleton instance")]
    NotStaticBinding { service: ServiceKey },

    #[error("Service '{service}' already has a cached singleton instance")]
    DuplicateInstance { service: ServiceKey },

    #[error("Circular dependency detected while building '{service}'. Chain: {}", .chain.join(" -> "))]
    CircularDependency {
        service: ServiceKey,
        chain: Vec<String>,
    },

    #[error("Service '{service}' depends on '{dependency}', which cannot be resolved")]
    UnresolvedDependency {
        service: ServiceKey,
        dependency: ServiceKey,
    },

    #[error("Injection target '{target}' of '{service}' expects '{expected}', but the container produced '{actual}'")]
    IncompatibleInjectionType {
        service: ServiceKey,
        target: String,
        expected: String,
        actual: String,
    },

    #[error("The container is flushing; '{operation}' is rejected")]
    FlushInProgress { operation: &'static str },

    #[error("Type cast failed: expected '{expected}', found '{actual}' while resolving '{service}'")]
    TypeCastFailed {
        service: ServiceKey,
        expected: &'static str,
        actual: String,
    },

    #[error("Failed to create service '{service}': {reason}")]
    CreationFailed { service: ServiceKey, reason: String },

    #[error("Service '{service}' received {count} user parameters, the limit is {limit}")]
    TooManyParameters {
        service: ServiceKey,
        count: usize,
        limit: usize,
    },

    #[error("Constructor of '{service}' asked for argument #{index} ('{expected}') which was not supplied")]
    MissingArgument {
        service: ServiceKey,
        index: usize,
        expected: &'static str,
    },
}

/// Failures raised by the application lifecycle and the global facade.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Operation '{operation}' is not allowed in lifecycle state {state:?}")]
    InvalidLifecycleState {
        operation: &'static str,
        state: Lifecycle,
    },

    #[error("Bootstrap agent '{0}' was supplied more than once")]
    DuplicateBootstrapAgent(String),

    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    #[error("No application is active")]
    NoActiveApplication,

    #[error("Application {0} is already active")]
    ApplicationAlreadyActive(uuid::Uuid),

    #[error("Provider '{provider}' failed: {reason}")]
    Provider { provider: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read file '{0}': {1}")]
    FileRead(String, #[source] std::io::Error),
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid value for '{key}': {reason}")]
    Invalid { key: String, reason: String },
}

/// Shorthand for hooks that want to surface a plain message.
pub fn provider_error(provider: impl Into<String>, reason: impl Into<String>) -> AppError {
    AppError::Provider {
        provider: provider.into(),
        reason: reason.into(),
    }
}
