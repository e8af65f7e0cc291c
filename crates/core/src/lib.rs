//! Shared configuration and error types for searchwatch.

pub mod config;
pub mod error;

pub use config::{PolicyConfig, WatchConfig};
pub use error::*;
