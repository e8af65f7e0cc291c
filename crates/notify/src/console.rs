//! Console notifier: writes one line per transition to stdout.

use crate::traits::{Notifier, NotifyError, NotifyStatus};

/// Prints notifications to stdout.
///
/// Also backs the `pagerduty` kind. Its `apikey` is checked by the factory
/// but nothing is sent to a pager service.
#[derive(Debug)]
pub struct ConsoleNotifier {
    label: String,
}

impl ConsoleNotifier {
    /// Plain console printer (`stdout` / `console` kinds).
    pub fn stdout() -> Self {
        Self {
            label: "stdout".to_string(),
        }
    }

    /// Console printer standing in for a pager integration.
    pub fn pagerduty() -> Self {
        Self {
            label: "pagerduty".to_string(),
        }
    }

    /// The line written for a notification.
    pub fn render(&self, status: NotifyStatus, violation_id: &str, policy_name: &str) -> String {
        format!("{} type={status} id={violation_id} {policy_name}", self.label)
    }
}

#[async_trait::async_trait]
impl Notifier for ConsoleNotifier {
    async fn notify(
        &self,
        status: NotifyStatus,
        violation_id: &str,
        policy_name: &str,
    ) -> Result<(), NotifyError> {
        println!("{}", self.render(status, violation_id, policy_name));
        Ok(())
    }

    fn channel_name(&self) -> &str {
        &self.label
    }
}
