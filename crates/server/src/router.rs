//! HTTP router construction.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;

use searchwatch_policy::PolicyEngine;

use crate::api;

/// Build the status router.
pub fn build_router(engine: Arc<PolicyEngine>) -> Router {
    Router::new()
        .route("/", get(api::status))
        .route("/health", get(api::health))
        .route("/api/policies", get(api::policies))
        .layer(CorsLayer::permissive())
        .with_state(engine)
}
