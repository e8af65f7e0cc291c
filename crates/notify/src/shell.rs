//! Shell-command notifier.
//!
//! Runs a configured executable with the positional arguments
//! `status violation_id policy_name`. A launch failure or non-zero exit
//! is a delivery failure.

use tokio::process::Command;

use crate::traits::{Notifier, NotifyError, NotifyStatus};

#[derive(Debug)]
pub struct ShellNotifier {
    command: String,
}

impl ShellNotifier {
    pub fn new(command: String) -> Self {
        Self { command }
    }
}

#[async_trait::async_trait]
impl Notifier for ShellNotifier {
    async fn notify(
        &self,
        status: NotifyStatus,
        violation_id: &str,
        policy_name: &str,
    ) -> Result<(), NotifyError> {
        let exit = Command::new(&self.command)
            .arg(status.as_str())
            .arg(violation_id)
            .arg(policy_name)
            .status()
            .await
            .map_err(|source| NotifyError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        if !exit.success() {
            return Err(NotifyError::CommandFailed {
                command: self.command.clone(),
                status: exit.to_string(),
            });
        }

        tracing::debug!(command = %self.command, "shell notification delivered");
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "shell"
    }
}
