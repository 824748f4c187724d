//! Error types for the gateway.

use thiserror::Error;

/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Errors that can occur while configuring or running the gateway.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Metrics recorder error: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Invalid tag in path: {0}")]
    InvalidTag(String),
}

/// Fatal configuration errors detected at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} not found, set it to a secret token or '' to disable authentication")]
    MissingAuthToken(String),

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}
