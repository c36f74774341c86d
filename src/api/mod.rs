//! HTTP API for health, readiness, ledger state, and metrics.

pub mod handlers;
pub mod routes;

pub use handlers::AppState;
pub use routes::{create_router, health_router};
