//! Notifier trait definition and shared error types.

use std::fmt;

use serde::Serialize;

/// Errors that can occur while building or invoking a handler.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("handler '{handler}' ({kind}): {param} must be defined")]
    MissingParameter {
        handler: String,
        kind: String,
        param: &'static str,
    },

    #[error("handler '{handler}': unknown handler type {kind}")]
    UnknownKind { handler: String, kind: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("expected response code 200 or 204, received {0}")]
    UnexpectedStatus(u16),

    #[error("command {command} exited with {status}")]
    CommandFailed { command: String, status: String },

    #[error("failed to launch {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("handler '{0}' is not registered")]
    NotRegistered(String),
}

/// The transition a notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyStatus {
    Violation,
    Resolved,
}

impl NotifyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotifyStatus::Violation => "violation",
            NotifyStatus::Resolved => "resolved",
        }
    }
}

impl fmt::Display for NotifyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for notification sink implementations.
///
/// Handlers are immutable after construction and shared across every
/// evaluation loop that references them.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Report a violation or resolution for one policy.
    async fn notify(
        &self,
        status: NotifyStatus,
        violation_id: &str,
        policy_name: &str,
    ) -> Result<(), NotifyError>;

    /// Handler kind for logs (e.g., "shell", "hipchat").
    fn channel_name(&self) -> &str;
}

/// Result of invoking a single handler during a fan-out.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchResult {
    pub handler: String,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}
