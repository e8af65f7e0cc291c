//! Policies: immutable configuration plus lock-guarded runtime state.
//!
//! The evaluation loop is the only writer of a policy's state. Status
//! readers take a [`PolicySnapshot`] copy under a read lock, so they never
//! observe a half-applied transition.

mod state;
mod violation_id;


use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use searchwatch_core::PolicyConfig;

pub use self::state::{Bounds, PolicyState, Transition};
pub use self::violation_id::generate_violation_id;

/// Index searched when a policy leaves `index` empty.
pub const DEFAULT_INDEX: &str = "_all";

/// A monitoring rule and its current runtime state.
#[derive(Debug)]
pub struct Policy {
    name: String,
    query: String,
    index: String,
    bounds: Bounds,
    frequency: Duration,
    handlers: Vec<String>,
    state: RwLock<PolicyState>,
}

impl Policy {
    /// Build a policy from its configuration, applying defaults.
    pub fn from_config(config: &PolicyConfig) -> Self {
        let bounds = Bounds::from_config(config.min_count, config.max_count);
        if config.max_count == 0 && bounds.max_count.is_none() {
            tracing::info!(event = "set_default", policy = %config.name, max_count = -1, "only min_count set, ignoring max_count");
        }

        let index = if config.index.is_empty() {
            tracing::info!(event = "set_default", policy = %config.name, index = DEFAULT_INDEX, "no index set");
            DEFAULT_INDEX.to_string()
        } else {
            config.index.clone()
        };

        Self {
            name: config.name.clone(),
            query: config.query.clone(),
            index,
            bounds,
            frequency: Duration::from_secs(config.frequency_seconds),
            handlers: config.handlers.clone(),
            state: RwLock::new(PolicyState::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn frequency(&self) -> Duration {
        self.frequency
    }

    pub fn handlers(&self) -> &[String] {
        &self.handlers
    }

    /// Shared view of the runtime state. A poisoned lock is still read:
    /// the state is plain data and every write leaves it consistent.
    pub fn state(&self) -> RwLockReadGuard<'_, PolicyState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Exclusive access for the evaluation loop. Never hold across `.await`.
    pub(crate) fn state_mut(&self) -> RwLockWriteGuard<'_, PolicyState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Point-in-time copy of configuration and runtime fields.
    pub fn snapshot(&self) -> PolicySnapshot {
        let state = self.state().clone();
        PolicySnapshot {
            name: self.name.clone(),
            query: self.query.clone(),
            index: self.index.clone(),
            min_count: self.bounds.min_count,
            max_count: self.bounds.max_count,
            frequency_seconds: self.frequency.as_secs(),
            handlers: self.handlers.clone(),
            last_run_at: state.last_run_at,
            last_error: state.last_error,
            triggered: state.triggered,
            triggered_at: state.triggered_at,
            violation_id: state.violation_id,
        }
    }
}

// ── Snapshot ────────────────────────────────────────────────────────

/// Read-only copy of a policy, served by the status surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicySnapshot {
    pub name: String,
    pub query: String,
    pub index: String,
    pub min_count: u64,
    pub max_count: Option<u64>,
    pub frequency_seconds: u64,
    pub handlers: Vec<String>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub triggered: bool,
    pub triggered_at: Option<DateTime<Utc>>,
    pub violation_id: Option<String>,
}

/// Line-oriented rendering used by the text status page.
impl fmt::Display for PolicySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Name: {}", self.name)?;
        writeln!(f, "Query: {}", self.query)?;
        writeln!(f, "Index: {}", self.index)?;
        writeln!(f, "FrequencySecs: {}", self.frequency_seconds)?;
        writeln!(f, "Handlers: [{}]", self.handlers.join(" "))?;
        match self.last_run_at {
            Some(at) => writeln!(f, "Last ran: {}", at.to_rfc3339())?,
            None => writeln!(f, "Last ran: never")?,
        }
        match &self.last_error {
            Some(err) => writeln!(f, "Query status: {err}")?,
            None => writeln!(f, "Query status: ok")?,
        }
        writeln!(f, "Violation status: {}", self.triggered)?;
        if self.triggered {
            if let Some(since) = self.triggered_at {
                writeln!(f, "Violation since: {}", since.to_rfc3339())?;
            }
            if let Some(id) = &self.violation_id {
                writeln!(f, "Violation ID: {id}")?;
            }
        }
        Ok(())
    }
}
