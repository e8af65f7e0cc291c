//! Notification handlers for policy violations and resolutions.
//!
//! This crate provides:
//! - `Notifier` trait for pluggable notification sinks
//! - Console, shell-command and chat-webhook implementations
//! - A factory that validates handler parameters per kind
//! - `HandlerRegistry` that fans a transition out to a policy's handlers

pub mod console;
pub mod factory;
pub mod registry;
pub mod shell;
pub mod traits;
pub mod webhook;

pub use factory::{build_notifier, HandlerKind};
pub use registry::HandlerRegistry;
pub use traits::{DispatchResult, Notifier, NotifyError, NotifyStatus};
