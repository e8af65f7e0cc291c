//! Handler factory: builds a notifier from its name and parameters.
//!
//! The kind is read from the `type` parameter, or from the handler name
//! when `type` is absent. Required parameters are checked here so a bad
//! handler definition fails at startup rather than on the first violation.

use std::collections::HashMap;
use std::sync::Arc;

use crate::console::ConsoleNotifier;
use crate::shell::ShellNotifier;
use crate::traits::{Notifier, NotifyError};
use crate::webhook::ChatWebhookNotifier;

/// Recognised handler kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    Console,
    PagerDuty,
    Shell,
    ChatWebhook,
}

impl HandlerKind {
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "stdout" | "console" => Some(Self::Console),
            "pagerduty" => Some(Self::PagerDuty),
            "shell" => Some(Self::Shell),
            "hipchat" | "webhook" => Some(Self::ChatWebhook),
            _ => None,
        }
    }
}

/// Build a notifier, failing with the name of the first missing parameter.
pub fn build_notifier(
    name: &str,
    params: &HashMap<String, String>,
) -> Result<Arc<dyn Notifier>, NotifyError> {
    let kind_name = params.get("type").map(String::as_str).unwrap_or(name);
    let kind = HandlerKind::parse(kind_name).ok_or_else(|| NotifyError::UnknownKind {
        handler: name.to_string(),
        kind: kind_name.to_string(),
    })?;

    let require = |param: &'static str| -> Result<String, NotifyError> {
        params
            .get(param)
            .cloned()
            .ok_or_else(|| NotifyError::MissingParameter {
                handler: name.to_string(),
                kind: kind_name.to_string(),
                param,
            })
    };

    let notifier: Arc<dyn Notifier> = match kind {
        HandlerKind::Console => Arc::new(ConsoleNotifier::stdout()),
        HandlerKind::PagerDuty => {
            require("apikey")?;
            Arc::new(ConsoleNotifier::pagerduty())
        }
        HandlerKind::Shell => Arc::new(ShellNotifier::new(require("command")?)),
        HandlerKind::ChatWebhook => {
            let apikey = require("apikey")?;
            let room = require("room")?;
            Arc::new(ChatWebhookNotifier::new(
                apikey,
                room,
                params.get("endpoint").cloned(),
            ))
        }
    };

    Ok(notifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn missing_param(result: Result<Arc<dyn Notifier>, NotifyError>) -> &'static str {
        match result {
            Err(NotifyError::MissingParameter { param, .. }) => param,
            Err(other) => panic!("expected MissingParameter, got: {other:?}"),
            Ok(n) => panic!("expected failure, built {}", n.channel_name()),
        }
    }

    #[test]
    fn stdout_needs_no_parameters() {
        let notifier = build_notifier("stdout", &HashMap::new()).unwrap();
        assert_eq!(notifier.channel_name(), "stdout");
    }

    #[test]
    fn pagerduty_requires_apikey() {
        assert_eq!(missing_param(build_notifier("pagerduty", &HashMap::new())), "apikey");
        let notifier = build_notifier("pagerduty", &params(&[("apikey", "abcd1234")])).unwrap();
        assert_eq!(notifier.channel_name(), "pagerduty");
    }

    #[test]
    fn shell_requires_command() {
        assert_eq!(missing_param(build_notifier("shell", &HashMap::new())), "command");
    }

    #[test]
    fn webhook_requires_apikey_then_room() {
        assert_eq!(
            missing_param(build_notifier("hipchat", &params(&[("room", "ops")]))),
            "apikey"
        );
        assert_eq!(
            missing_param(build_notifier("hipchat", &params(&[("apikey", "k")]))),
            "room"
        );
    }

    #[test]
    fn webhook_without_endpoint_uses_default() {
        let notifier =
            build_notifier("hipchat", &params(&[("apikey", "k"), ("room", "ops")])).unwrap();
        assert_eq!(notifier.channel_name(), "hipchat");
    }

    #[test]
    fn type_parameter_overrides_name() {
        let notifier = build_notifier(
            "ops-room",
            &params(&[("type", "webhook"), ("apikey", "k"), ("room", "ops")]),
        )
        .unwrap();
        assert_eq!(notifier.channel_name(), "hipchat");
    }

    #[test]
    fn unknown_kind_rejected() {
        let err = build_notifier("carrier-pigeon", &HashMap::new()).err().unwrap();
        assert!(err.to_string().contains("unknown handler type carrier-pigeon"));
    }
}
