//! Status surface handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use searchwatch_policy::{PolicyEngine, PolicySnapshot};

// ── Status ────────────────────────────────────────────────────────

/// `GET /`: human-readable status of every policy.
pub async fn status(State(engine): State<Arc<PolicyEngine>>) -> String {
    engine.status()
}

/// `GET /api/policies`: the same snapshot as JSON.
pub async fn policies(State(engine): State<Arc<PolicyEngine>>) -> Json<Vec<PolicySnapshot>> {
    Json(engine.snapshots())
}

// ── Health ────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub policies: usize,
    pub triggered: usize,
}

pub async fn health(State(engine): State<Arc<PolicyEngine>>) -> Json<HealthResponse> {
    let snapshots = engine.snapshots();
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        policies: snapshots.len(),
        triggered: snapshots.iter().filter(|s| s.triggered).count(),
    })
}
