//! HTTP API route definitions.

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use super::handlers::{health, metrics, ready, state, AppState};

/// Create the API router.
pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(health))
        .route("/ready", get(ready))
        // Ledger + market state
        .route("/api/v1/state", get(state))
        // Prometheus metrics
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Create a minimal health-only router (for startup).
pub fn health_router() -> Router {
    Router::new().route("/health", get(health))
}
