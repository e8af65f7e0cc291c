//! Errors surfaced while constructing the engine.

use searchwatch_core::ConfigError;
use searchwatch_notify::NotifyError;

/// Configuration-time failures. Runtime query and handler failures never
/// reach this type; they stay inside the loop that produced them.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Handler configuration error: {0}")]
    Handler(#[from] NotifyError),

    #[error("Policy {policy} specified a handler {handler} but it wasn't defined")]
    UnknownHandler { policy: String, handler: String },

    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),
}
