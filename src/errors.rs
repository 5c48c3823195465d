//! Error types shared across the lifecycle layer.

use thiserror::Error;

/// Boxed error raised by leaf components.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error returned by [`Component`](crate::lifecycle::Component) operations.
///
/// Leaf components report [`ComponentError::Failed`]; composites wrap the
/// failing child's error with its position, name and lifecycle phase so a
/// partial startup or teardown can be diagnosed from the error alone.
#[derive(Debug, Error)]
pub enum ComponentError {
    /// A child failed to start.
    #[error("component #{index} '{name}' failed to start: {source}")]
    Start {
        index: usize,
        name: String,
        #[source]
        source: Box<ComponentError>,
    },

    /// A child failed to stop.
    #[error("component #{index} '{name}' failed to stop: {source}")]
    Stop {
        index: usize,
        name: String,
        #[source]
        source: Box<ComponentError>,
    },

    /// A child failed to be killed.
    #[error("component #{index} '{name}' failed to kill: {source}")]
    Kill {
        index: usize,
        name: String,
        #[source]
        source: Box<ComponentError>,
    },

    /// Several children failed during a best-effort teardown.
    #[error("{} components failed: {}", .0.len(), join_errors(.0))]
    Multiple(Vec<ComponentError>),

    /// A command flag carried an unusable value.
    #[error("invalid flag --{flag}: {reason}")]
    InvalidFlag { flag: String, reason: String },

    /// A leaf component failed.
    #[error("{0}")]
    Failed(#[source] BoxError),
}

impl ComponentError {
    /// Wrap any error raised by a leaf component.
    pub fn new<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        ComponentError::Failed(err.into())
    }

    /// Build a leaf error from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        ComponentError::Failed(message.into().into())
    }
}

impl From<std::io::Error> for ComponentError {
    fn from(err: std::io::Error) -> Self {
        ComponentError::Failed(Box::new(err))
    }
}

fn join_errors(errors: &[ComponentError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O error when loading config.
    #[error("failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },

    /// TOML parsing error.
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    /// Validation failed with one or more errors.
    #[error("config validation failed: {}", .0.join(", "))]
    ValidationFailed(Vec<String>),
}

/// Errors surfaced by [`Service`](crate::service::Service) construction and
/// execution.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Argument parsing failed, or help/version output was requested.
    #[error(transparent)]
    Cli(#[from] clap::Error),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A construction option was rejected.
    #[error("invalid service configuration: {0}")]
    Construction(String),

    /// The parsed command has no bound handler.
    #[error("no handler bound for command '{0}'")]
    UnknownCommand(String),

    /// Applying parsed flags to a component failed.
    #[error("failed to configure command '{command}': {source}")]
    Configure {
        command: String,
        #[source]
        source: ComponentError,
    },

    /// The global component failed to start.
    #[error("global component failed to start: {0}")]
    GlobalStart(#[source] ComponentError),

    /// The global component failed to stop.
    #[error("global component failed to stop: {0}")]
    GlobalStop(#[source] ComponentError),
}
