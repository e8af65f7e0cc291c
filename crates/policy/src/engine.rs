//! [`PolicyEngine`]: owns the policy set and handler registry and runs one
//! evaluation loop per policy.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use searchwatch_core::{PolicyConfig, WatchConfig};
use searchwatch_notify::HandlerRegistry;

use crate::error::EngineError;
use crate::policy::{Policy, PolicySnapshot};
use crate::search::SearchBackend;
use crate::worker::PolicyWorker;

/// Running set of evaluation loops plus the read-only status surface.
///
/// Must be started inside a tokio runtime. Loops run until
/// [`shutdown`](PolicyEngine::shutdown) is called.
pub struct PolicyEngine {
    policies: Vec<Arc<Policy>>,
    registry: Arc<HandlerRegistry>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl PolicyEngine {
    /// Build every handler, check policy references and start the loops.
    pub fn start(
        config: &WatchConfig,
        backend: Arc<dyn SearchBackend>,
    ) -> Result<Self, EngineError> {
        let registry = HandlerRegistry::from_config(&config.handlers)?;
        Self::start_with_registry(&config.policies, registry, backend)
    }

    /// Start loops for `policies` against an already-built registry.
    pub fn start_with_registry(
        policies: &[PolicyConfig],
        registry: HandlerRegistry,
        backend: Arc<dyn SearchBackend>,
    ) -> Result<Self, EngineError> {
        for policy in policies {
            if policy.frequency_seconds == 0 {
                return Err(EngineError::InvalidPolicy(format!(
                    "{}: polling_secs must be nonzero",
                    policy.name
                )));
            }
            if let Some(missing) = policy.handlers.iter().find(|h| !registry.contains(h)) {
                return Err(EngineError::UnknownHandler {
                    policy: policy.name.clone(),
                    handler: missing.clone(),
                });
            }
        }

        let registry = Arc::new(registry);
        let (shutdown, shutdown_rx) = watch::channel(false);

        let policies: Vec<Arc<Policy>> = policies
            .iter()
            .map(|cfg| Arc::new(Policy::from_config(cfg)))
            .collect();

        let tasks = policies
            .iter()
            .map(|policy| {
                let worker = PolicyWorker::new(policy.clone(), backend.clone(), registry.clone());
                tokio::spawn(worker.run(shutdown_rx.clone()))
            })
            .collect();

        info!(
            policies = policies.len(),
            handlers = registry.len(),
            "policy engine started"
        );

        Ok(Self {
            policies,
            registry,
            shutdown,
            tasks,
        })
    }

    pub fn policies(&self) -> &[Arc<Policy>] {
        &self.policies
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Point-in-time copies of every policy, in configured order.
    pub fn snapshots(&self) -> Vec<PolicySnapshot> {
        self.policies.iter().map(|p| p.snapshot()).collect()
    }

    /// Text status page: a header line, then each policy followed by a
    /// blank line.
    pub fn status(&self) -> String {
        let mut out = String::from("Policies\n");
        for snapshot in self.snapshots() {
            out.push_str(&snapshot.to_string());
            out.push('\n');
        }
        out
    }

    /// Signal every loop to stop after its current cycle.
    pub fn stop(&self) {
        // Err only when every loop has already exited.
        let _ = self.shutdown.send(true);
    }

    /// Stop every loop and wait for them to finish.
    pub async fn shutdown(self) {
        self.stop();
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "policy worker ended abnormally");
            }
        }
        info!("policy engine stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use searchwatch_notify::{Notifier, NotifyError, NotifyStatus};

    use crate::search::{SearchError, SearchResult};

    struct FixedBackend {
        count: u64,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl SearchBackend for FixedBackend {
        async fn search(&self, _index: &str, _query: &str) -> Result<SearchResult, SearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(SearchResult {
                total_hits: self.count,
                took_ms: 1,
            })
        }
    }

    struct CountingNotifier(Arc<AtomicUsize>);

    #[async_trait::async_trait]
    impl Notifier for CountingNotifier {
        async fn notify(&self, _: NotifyStatus, _: &str, _: &str) -> Result<(), NotifyError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn channel_name(&self) -> &str {
            "counting"
        }
    }

    fn policy(name: &str, min_count: u64, handlers: &[&str]) -> PolicyConfig {
        PolicyConfig {
            name: name.to_string(),
            query: "*".to_string(),
            index: String::new(),
            min_count,
            max_count: -1,
            frequency_seconds: 60,
            handlers: handlers.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn backend(count: u64) -> Arc<FixedBackend> {
        Arc::new(FixedBackend {
            count,
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn rejects_unknown_handler_reference() {
        let result = PolicyEngine::start_with_registry(
            &[policy("p", 1, &["missing"])],
            HandlerRegistry::empty(),
            backend(0),
        );
        match result {
            Err(EngineError::UnknownHandler { policy, handler }) => {
                assert_eq!(policy, "p");
                assert_eq!(handler, "missing");
            }
            Err(other) => panic!("expected UnknownHandler, got: {other:?}"),
            Ok(_) => panic!("engine should not start"),
        }
    }

    #[tokio::test]
    async fn rejects_zero_frequency() {
        let mut cfg = policy("p", 1, &[]);
        cfg.frequency_seconds = 0;
        let result =
            PolicyEngine::start_with_registry(&[cfg], HandlerRegistry::empty(), backend(0));
        assert!(matches!(result, Err(EngineError::InvalidPolicy(msg)) if msg.starts_with("p:")));
    }

    #[tokio::test]
    async fn start_fails_on_bad_handler_definition() {
        let config = WatchConfig {
            listen_address: "127.0.0.1:0".to_string(),
            elasticsearch_url: "http://127.0.0.1:9200".to_string(),
            handlers: HashMap::from([("hipchat".to_string(), HashMap::new())]),
            policies: Vec::new(),
        };
        let result = PolicyEngine::start(&config, backend(0));
        assert!(matches!(result, Err(EngineError::Handler(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn runs_every_policy_independently() {
        let notified = Arc::new(AtomicUsize::new(0));
        let mut registry = HandlerRegistry::empty();
        registry.insert("count", Arc::new(CountingNotifier(notified.clone())));

        let backend = backend(5);
        let engine = PolicyEngine::start_with_registry(
            &[
                policy("needs ten", 10, &["count"]),
                policy("needs one", 1, &["count"]),
            ],
            registry,
            backend.clone(),
        )
        .unwrap();

        tokio::time::sleep(Duration::from_secs(125)).await;

        // Two policies, three cycles each (t=0, 60, 120).
        assert_eq!(backend.calls.load(Ordering::SeqCst), 6);
        // Only "needs ten" violates, and only notifies once.
        assert_eq!(notified.load(Ordering::SeqCst), 1);

        let snapshots = engine.snapshots();
        assert_eq!(snapshots[0].name, "needs ten");
        assert!(snapshots[0].triggered);
        assert!(!snapshots[1].triggered);

        let status = engine.status();
        assert!(status.starts_with("Policies\n"));
        assert!(status.contains("Name: needs ten\n"));
        assert!(status.contains("Name: needs one\n"));

        engine.shutdown().await;
    }
}
