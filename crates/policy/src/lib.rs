//! Policy evaluation engine.
//!
//! This crate provides:
//! - `SearchBackend` trait consumed for count queries
//! - `Policy` configuration plus its lock-guarded runtime state
//! - The violation/resolution state machine and violation ids
//! - One evaluation loop per policy, driven by `PolicyEngine`

pub mod engine;
pub mod error;
pub mod policy;
pub mod search;
pub mod worker;

pub use engine::PolicyEngine;
pub use error::EngineError;
pub use policy::{Bounds, Policy, PolicySnapshot, PolicyState, Transition};
pub use search::{SearchBackend, SearchError, SearchResult};
pub use worker::{CycleReport, PolicyWorker};
