//! HTTP API handlers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;

use crate::ledger::Ledger;
use crate::stats::TradeFlow;

/// Application state shared with handlers.
///
/// Handlers read the ledger while reconciliation batches run; per-collection
/// reads are consistent but cross-collection views are not transactional, so
/// the numbers here are display-grade, not accounting-grade.
#[derive(Clone)]
pub struct AppState {
    /// Whether the feed is connected and the ledger is live.
    pub ready: Arc<AtomicBool>,
    /// The reconciliation ledger.
    pub ledger: Arc<Ledger>,
    /// Trade flow statistics.
    pub flow: Arc<TradeFlow>,
    /// Prometheus render handle, when the exporter is installed.
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new app state around a ledger and flow aggregator.
    pub fn new(ledger: Arc<Ledger>, flow: Arc<TradeFlow>) -> Self {
        Self {
            ready: Arc::new(AtomicBool::new(false)),
            ledger,
            flow,
            prometheus: None,
        }
    }

    /// Attach a Prometheus render handle for the /metrics route.
    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }

    /// Set ready state.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Check if ready.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// Whether the feed is live.
    pub ready: bool,
}

/// Count and net signed quantity of one collection.
#[derive(Debug, Serialize)]
pub struct TableSummary {
    /// Tracked identities.
    pub count: usize,
    /// Arithmetic sum of signed quantities.
    pub net_qty: i64,
}

/// Trade flow summary.
#[derive(Debug, Serialize)]
pub struct FlowSummary {
    /// Last traded price.
    pub last_price: String,
    /// Execution-derived best ask.
    pub ask: String,
    /// Execution-derived best bid.
    pub bid: String,
    /// Batch taker volume: total.
    pub volume: i64,
    /// Batch taker volume: buy side.
    pub buy_volume: i64,
    /// Batch taker volume: sell side.
    pub sell_volume: i64,
    /// Reporting delay of the last batch in milliseconds.
    pub delay_ms: i128,
}

/// Full state response.
#[derive(Debug, Serialize)]
pub struct StateResponse {
    /// Service status.
    pub status: &'static str,
    /// Resting orders.
    pub orders: TableSummary,
    /// Accumulated positions.
    pub positions: TableSummary,
    /// Cancel tombstones.
    pub cancels: TableSummary,
    /// Market statistics from the trade feed.
    pub flow: FlowSummary,
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Readiness check handler - returns 200 if ready, 503 otherwise.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let is_ready = state.is_ready();
    let response = ReadyResponse { ready: is_ready };

    if is_ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// State handler - ledger collection summaries plus market statistics.
pub async fn state(State(state): State<AppState>) -> impl IntoResponse {
    let (orders_count, orders_net) = state.ledger.orders().sum();
    let (positions_count, positions_net) = state.ledger.positions().sum();
    let (cancels_count, cancels_net) = state.ledger.cancels().sum();

    let (ask, bid) = state.flow.best();
    let (volume, buy_volume, sell_volume) = state.flow.volume();

    Json(StateResponse {
        status: if state.is_ready() { "running" } else { "starting" },
        orders: TableSummary {
            count: orders_count,
            net_qty: orders_net,
        },
        positions: TableSummary {
            count: positions_count,
            net_qty: positions_net,
        },
        cancels: TableSummary {
            count: cancels_count,
            net_qty: cancels_net,
        },
        flow: FlowSummary {
            last_price: state.flow.last_price().to_string(),
            ask: ask.to_string(),
            bid: bid.to_string(),
            volume,
            buy_volume,
            sell_volume,
            delay_ms: state.flow.delay().whole_milliseconds(),
        },
    })
}

/// Prometheus metrics handler.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.prometheus {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics exporter not installed\n".to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state() -> AppState {
        AppState::new(Arc::new(Ledger::new()), Arc::new(TradeFlow::new()))
    }

    #[test]
    fn app_state_ready_toggle() {
        let state = test_state();
        assert!(!state.is_ready());

        state.set_ready(true);
        assert!(state.is_ready());

        state.set_ready(false);
        assert!(!state.is_ready());
    }
}
