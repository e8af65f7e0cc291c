//! Named handler instances and the per-policy fan-out.
//!
//! A fan-out invokes a policy's handlers in configured order, one at a
//! time. Individual handler failures are logged and don't block the
//! handlers after them.

use std::collections::HashMap;
use std::sync::Arc;

use crate::factory::build_notifier;
use crate::traits::{DispatchResult, Notifier, NotifyError, NotifyStatus};

/// Handler name → notifier instance.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn Notifier>>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build every handler definition in name order, failing on the first
    /// invalid one.
    pub fn from_config(
        definitions: &HashMap<String, HashMap<String, String>>,
    ) -> Result<Self, NotifyError> {
        let mut ordered: Vec<_> = definitions.iter().collect();
        ordered.sort_unstable_by(|a, b| a.0.cmp(b.0));

        let mut handlers = HashMap::with_capacity(definitions.len());
        for (name, params) in ordered {
            let notifier = build_notifier(name, params)?;
            tracing::debug!(handler = %name, kind = notifier.channel_name(), "handler registered");
            handlers.insert(name.clone(), notifier);
        }
        Ok(Self { handlers })
    }

    /// Register (or replace) a handler under `name`.
    pub fn insert(&mut self, name: impl Into<String>, notifier: Arc<dyn Notifier>) {
        self.handlers.insert(name.into(), notifier);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Notifier>> {
        self.handlers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered handler names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Invoke `handler_names` in order for one policy transition.
    ///
    /// Returns one result per handler. Failures are logged with handler and
    /// policy identity and never retried.
    pub async fn fan_out(
        &self,
        policy_name: &str,
        handler_names: &[String],
        status: NotifyStatus,
        violation_id: &str,
    ) -> Vec<DispatchResult> {
        let mut results = Vec::with_capacity(handler_names.len());

        for name in handler_names {
            tracing::info!(
                event = "trigger_handler",
                mode = %status,
                policy = %policy_name,
                id = %violation_id,
                handler = %name,
                "invoking handler"
            );

            let start = std::time::Instant::now();
            let result = match self.handlers.get(name) {
                Some(notifier) => notifier.notify(status, violation_id, policy_name).await,
                None => Err(NotifyError::NotRegistered(name.clone())),
            };
            let duration_ms = start.elapsed().as_millis() as u64;

            let error = match result {
                Ok(()) => None,
                Err(e) => {
                    tracing::warn!(
                        event = "handler_error",
                        mode = %status,
                        policy = %policy_name,
                        handler = %name,
                        error = %e,
                        duration_ms,
                        "handler failed"
                    );
                    Some(e.to_string())
                }
            };

            results.push(DispatchResult {
                handler: name.clone(),
                success: error.is_none(),
                error,
                duration_ms,
            });
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    type Calls = Arc<Mutex<Vec<(String, NotifyStatus, String, String)>>>;

    struct MockNotifier {
        name: String,
        calls: Calls,
        should_fail: bool,
    }

    #[async_trait::async_trait]
    impl Notifier for MockNotifier {
        async fn notify(
            &self,
            status: NotifyStatus,
            violation_id: &str,
            policy_name: &str,
        ) -> Result<(), NotifyError> {
            self.calls.lock().unwrap().push((
                self.name.clone(),
                status,
                violation_id.to_string(),
                policy_name.to_string(),
            ));
            if self.should_fail {
                Err(NotifyError::UnexpectedStatus(500))
            } else {
                Ok(())
            }
        }

        fn channel_name(&self) -> &str {
            &self.name
        }
    }

    fn registry_with(specs: &[(&str, bool)], calls: &Calls) -> HandlerRegistry {
        let mut registry = HandlerRegistry::empty();
        for (name, should_fail) in specs {
            registry.insert(
                *name,
                Arc::new(MockNotifier {
                    name: name.to_string(),
                    calls: calls.clone(),
                    should_fail: *should_fail,
                }),
            );
        }
        registry
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn fans_out_in_configured_order() {
        let calls: Calls = Arc::default();
        let registry = registry_with(&[("a", false), ("b", false), ("c", false)], &calls);

        let results = registry
            .fan_out("p1", &names(&["c", "a", "b"]), NotifyStatus::Violation, "abc123")
            .await;

        assert!(results.iter().all(|r| r.success));
        let calls = calls.lock().unwrap();
        let order: Vec<&str> = calls.iter().map(|c| c.0.as_str()).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
        let first = &calls[0];
        assert_eq!(first.1, NotifyStatus::Violation);
        assert_eq!(first.2, "abc123");
        assert_eq!(first.3, "p1");
    }

    #[tokio::test]
    async fn partial_failure_doesnt_block() {
        let calls: Calls = Arc::default();
        let registry = registry_with(&[("fail", true), ("ok", false)], &calls);

        let results = registry
            .fan_out("p1", &names(&["fail", "ok"]), NotifyStatus::Resolved, "id")
            .await;

        assert_eq!(results.len(), 2);
        assert!(!results[0].success);
        assert!(results[0].error.is_some());
        assert!(results[1].success);
        assert_eq!(calls.lock().unwrap().len(), 2); // second handler still ran
    }

    #[tokio::test]
    async fn unregistered_handler_reported_not_fatal() {
        let calls: Calls = Arc::default();
        let registry = registry_with(&[("ok", false)], &calls);

        let results = registry
            .fan_out("p1", &names(&["ghost", "ok"]), NotifyStatus::Violation, "id")
            .await;

        assert!(!results[0].success);
        assert!(results[1].success);
    }

    #[test]
    fn from_config_builds_every_handler() {
        let mut definitions = HashMap::new();
        definitions.insert("stdout".to_string(), HashMap::new());
        definitions.insert(
            "pagerduty".to_string(),
            HashMap::from([("apikey".to_string(), "abcd1234".to_string())]),
        );
        let registry = HandlerRegistry::from_config(&definitions).unwrap();
        assert_eq!(registry.names(), vec!["pagerduty", "stdout"]);
        assert!(registry.contains("stdout"));
    }

    #[test]
    fn from_config_fails_fast() {
        let mut definitions = HashMap::new();
        definitions.insert("shell".to_string(), HashMap::new());
        let err = HandlerRegistry::from_config(&definitions).err().unwrap();
        assert!(err.to_string().contains("command must be defined"));
    }

    #[test]
    fn first_invalid_handler_by_name_is_reported() {
        let typed = |kind: &str| HashMap::from([("type".to_string(), kind.to_string())]);

        // Fresh maps get fresh hash seeds, so iteration order differs.
        for _ in 0..16 {
            let definitions = HashMap::from([
                ("zulu-pager".to_string(), typed("pagerduty")),
                ("alpha-shell".to_string(), typed("shell")),
                ("mike-room".to_string(), typed("hipchat")),
                ("stdout".to_string(), HashMap::new()),
            ]);
            match HandlerRegistry::from_config(&definitions).err().unwrap() {
                NotifyError::MissingParameter { handler, param, .. } => {
                    assert_eq!(handler, "alpha-shell");
                    assert_eq!(param, "command");
                }
                other => panic!("expected MissingParameter, got: {other:?}"),
            }
        }
    }
}
