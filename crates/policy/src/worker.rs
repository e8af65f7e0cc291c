//! Per-policy evaluation loop.
//!
//! Each policy gets its own tokio task. A cycle queries the backend,
//! feeds the count through the policy's state machine and, on a
//! violation or resolution, fans out to the policy's handlers before the
//! next tick. Cycles of one policy never overlap; missed ticks are not
//! caught up.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use searchwatch_notify::{DispatchResult, HandlerRegistry, NotifyStatus};

use crate::policy::{Policy, Transition};
use crate::search::SearchBackend;

/// What one evaluation cycle did.
#[derive(Debug)]
pub struct CycleReport {
    /// Result count, or `None` when the query failed.
    pub count: Option<u64>,
    /// State transition, or `None` when the query failed.
    pub transition: Option<Transition>,
    /// One entry per handler invoked during this cycle.
    pub dispatched: Vec<DispatchResult>,
}

/// Drives one policy: owns its cadence and is the sole writer of its state.
pub struct PolicyWorker {
    policy: Arc<Policy>,
    backend: Arc<dyn SearchBackend>,
    registry: Arc<HandlerRegistry>,
}

impl PolicyWorker {
    pub fn new(
        policy: Arc<Policy>,
        backend: Arc<dyn SearchBackend>,
        registry: Arc<HandlerRegistry>,
    ) -> Self {
        Self {
            policy,
            backend,
            registry,
        }
    }

    pub fn policy(&self) -> &Arc<Policy> {
        &self.policy
    }

    /// Run one query-and-decide pass.
    ///
    /// Backend errors are recorded on the policy and end the cycle; the
    /// next tick is an independent attempt.
    pub async fn run_cycle(&self) -> CycleReport {
        let policy = &self.policy;
        debug!(
            event = "query_start",
            policy = %policy.name(),
            index = %policy.index(),
            query = %policy.query(),
            "running query"
        );

        let result = self.backend.search(policy.index(), policy.query()).await;
        let now = Utc::now();

        let found = match result {
            Ok(found) => found,
            Err(e) => {
                warn!(event = "query_error", policy = %policy.name(), error = %e, "query failed");
                policy.state_mut().record_error(e.to_string(), now);
                return CycleReport {
                    count: None,
                    transition: None,
                    dispatched: Vec::new(),
                };
            }
        };
        debug!(event = "query_ok", policy = %policy.name(), rt_ms = found.took_ms, "query completed");

        let count = found.total_hits;
        let bounds = *policy.bounds();
        let min = bounds.min_count;
        let max = bounds.max_count.map_or(-1, |m| m as i64);

        // Write lock is released before any handler runs.
        let transition = policy
            .state_mut()
            .observe(policy.name(), &bounds, count, now);

        let dispatched = match &transition {
            Transition::NewViolation { violation_id } => {
                warn!(event = "violation", policy = %policy.name(), events = count, min, max, id = %violation_id, "policy in violation");
                self.registry
                    .fan_out(policy.name(), policy.handlers(), NotifyStatus::Violation, violation_id)
                    .await
            }
            Transition::Extended { since } => {
                info!(event = "violation_extended", policy = %policy.name(), events = count, min, max, violation_start = %since.to_rfc3339(), "violation continues");
                Vec::new()
            }
            Transition::Resolved {
                violation_id,
                duration,
            } => {
                info!(event = "resolved", policy = %policy.name(), events = count, min, max, id = %violation_id, duration_secs = duration.num_seconds(), "violation resolved");
                self.registry
                    .fan_out(policy.name(), policy.handlers(), NotifyStatus::Resolved, violation_id)
                    .await
            }
            Transition::Compliant => {
                info!(event = "policy_ok", policy = %policy.name(), events = count, min, max, "policy ok");
                Vec::new()
            }
        };

        CycleReport {
            count: Some(count),
            transition: Some(transition),
            dispatched,
        }
    }

    /// Evaluate forever, once per policy frequency, until `shutdown` flips
    /// to `true`. A dropped sender leaves the loop running.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let period = self.policy.frequency();
        if period.is_zero() {
            error!(
                event = "invalid_policy",
                policy = %self.policy.name(),
                "polling frequency is zero, worker not started"
            );
            return;
        }

        info!(
            event = "start_worker",
            policy = %self.policy.name(),
            poll_frequency = period.as_secs(),
            "worker started"
        );

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut listening = true;

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                biased;
                changed = shutdown.changed(), if listening => {
                    if changed.is_err() {
                        listening = false;
                    }
                    continue;
                }
                _ = ticker.tick() => {}
            }
            self.run_cycle().await;
        }

        info!(event = "stop_worker", policy = %self.policy.name(), "worker stopped");
    }
}
