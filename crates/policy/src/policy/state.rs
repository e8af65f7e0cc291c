//! Runtime state and the violation/resolution state machine.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::violation_id::generate_violation_id;

// ── Bounds ──────────────────────────────────────────────────────────

/// Acceptable result-count range. `max_count == None` is unbounded above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Bounds {
    pub min_count: u64,
    pub max_count: Option<u64>,
}

impl Bounds {
    /// Normalize configured bounds.
    ///
    /// A negative `max_count` means unbounded. When only a minimum is set
    /// (`min_count > 0`, `max_count == 0`) the maximum is dropped as well.
    /// Both zero keeps `max_count = 0`: any match is a violation.
    pub fn from_config(min_count: u64, max_count: i64) -> Self {
        let max_count = if max_count < 0 || (max_count == 0 && min_count > 0) {
            None
        } else {
            Some(max_count as u64)
        };
        Self {
            min_count,
            max_count,
        }
    }

    pub fn is_violated(&self, count: u64) -> bool {
        count < self.min_count || self.max_count.is_some_and(|max| count > max)
    }
}

// ── Transitions ─────────────────────────────────────────────────────

/// Outcome of feeding one successful count into a policy's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Compliant before, violating now: notify with status "violation".
    NewViolation { violation_id: String },
    /// Still violating; no notification.
    Extended { since: DateTime<Utc> },
    /// Violating before, compliant now: notify with status "resolved".
    Resolved {
        violation_id: String,
        duration: chrono::Duration,
    },
    /// Compliant before and now.
    Compliant,
}

impl Transition {
    /// Whether this transition fans out to handlers.
    pub fn notifies(&self) -> bool {
        matches!(
            self,
            Transition::NewViolation { .. } | Transition::Resolved { .. }
        )
    }
}

// ── State ───────────────────────────────────────────────────────────

/// Mutable runtime fields of a policy, written only by its own loop.
///
/// `triggered_at` is set exactly while `triggered` is true. `violation_id`
/// keeps the last episode's id after resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PolicyState {
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub triggered: bool,
    pub triggered_at: Option<DateTime<Utc>>,
    pub violation_id: Option<String>,
}

impl PolicyState {
    /// Record a failed query. Violation fields are left untouched.
    pub fn record_error(&mut self, error: String, at: DateTime<Utc>) {
        self.last_run_at = Some(at);
        self.last_error = Some(error);
    }

    /// Record a successful query returning `count` and advance the state
    /// machine.
    pub fn observe(
        &mut self,
        policy_name: &str,
        bounds: &Bounds,
        count: u64,
        now: DateTime<Utc>,
    ) -> Transition {
        self.last_run_at = Some(now);
        self.last_error = None;

        if bounds.is_violated(count) {
            if self.triggered {
                return Transition::Extended {
                    since: self.triggered_at.unwrap_or(now),
                };
            }
            let violation_id = generate_violation_id(policy_name, now);
            self.triggered = true;
            self.triggered_at = Some(now);
            self.violation_id = Some(violation_id.clone());
            Transition::NewViolation { violation_id }
        } else if self.triggered {
            self.triggered = false;
            let started = self.triggered_at.take().unwrap_or(now);
            Transition::Resolved {
                violation_id: self.violation_id.clone().unwrap_or_default(),
                duration: now.signed_duration_since(started),
            }
        } else {
            Transition::Compliant
        }
    }
}
