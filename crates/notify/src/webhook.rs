//! Chat-room webhook notifier.
//!
//! Posts a plain-text message to a HipChat-style room notification
//! endpoint. The room token travels as the `auth_token` query parameter.

use crate::traits::{Notifier, NotifyError, NotifyStatus};

/// Public service endpoint used when the handler omits `endpoint`.
pub const DEFAULT_ENDPOINT: &str = "https://api.hipchat.com/";

/// Delivers notifications as an HTTP POST to a chat room.
#[derive(Debug)]
pub struct ChatWebhookNotifier {
    apikey: String,
    endpoint: String,
    room: String,
    /// Shared HTTP client (connection pooling).
    client: reqwest::Client,
}

impl ChatWebhookNotifier {
    /// Create a notifier; `endpoint` falls back to [`DEFAULT_ENDPOINT`].
    pub fn new(apikey: String, room: String, endpoint: Option<String>) -> Self {
        Self {
            apikey,
            endpoint: endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            room,
            client: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Room notification URL, without the token.
    pub fn notification_url(&self) -> String {
        format!(
            "{}/v2/room/{}/notification",
            self.endpoint.trim_end_matches('/'),
            self.room
        )
    }

    /// Plain-text message body.
    pub fn render_body(status: NotifyStatus, violation_id: &str, policy_name: &str) -> String {
        format!("searchwatch status={status} policy={policy_name:?} id={violation_id}")
    }
}

#[async_trait::async_trait]
impl Notifier for ChatWebhookNotifier {
    async fn notify(
        &self,
        status: NotifyStatus,
        violation_id: &str,
        policy_name: &str,
    ) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(self.notification_url())
            .query(&[("auth_token", self.apikey.as_str())])
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(Self::render_body(status, violation_id, policy_name))
            .send()
            .await?;

        let code = response.status();
        if code != reqwest::StatusCode::OK && code != reqwest::StatusCode::NO_CONTENT {
            tracing::debug!(room = %self.room, status = %code, "chat webhook returned unexpected status");
            return Err(NotifyError::UnexpectedStatus(code.as_u16()));
        }

        // Drain the body so the connection can be reused.
        let _ = response.bytes().await;

        tracing::debug!(room = %self.room, status = %code, "chat notification delivered");
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "hipchat"
    }
}
