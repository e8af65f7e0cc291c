use thiserror::Error;

/// Errors raised while loading or validating the configuration document.
///
/// Every variant is fatal at startup: the process must not start with an
/// invalid configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result alias for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
