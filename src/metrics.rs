//! Prometheus metrics for reconciliation and feed monitoring.
//!
//! This module provides metrics for:
//! - Execution report throughput and drop rate
//! - Fill matching outcomes (partial/completed/unmatched)
//! - Batch application latency
//! - WebSocket feed health

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use tracing::debug;

// === Metric Name Constants ===

/// Batch application latency metric name.
pub const METRIC_BATCH_APPLY_LATENCY: &str = "batch_apply_latency_ms";
/// WebSocket message latency metric name.
pub const METRIC_WS_MESSAGE_LATENCY: &str = "ws_message_latency_ms";
/// Reports applied counter metric name.
pub const METRIC_REPORTS_APPLIED: &str = "reports_applied_total";
/// Reports dropped counter metric name.
pub const METRIC_REPORTS_DROPPED: &str = "reports_dropped_total";
/// Partial fills counter metric name.
pub const METRIC_FILLS_PARTIAL: &str = "fills_partial_total";
/// Completed fills counter metric name.
pub const METRIC_FILLS_COMPLETED: &str = "fills_completed_total";
/// Unmatched fills counter metric name.
pub const METRIC_FILLS_UNMATCHED: &str = "fills_unmatched_total";
/// Canceled orders counter metric name.
pub const METRIC_ORDERS_CANCELED: &str = "orders_canceled_total";
/// WebSocket messages received counter metric name.
pub const METRIC_WS_MESSAGES_RECEIVED: &str = "ws_messages_received_total";
/// WebSocket reconnects counter metric name.
pub const METRIC_WS_RECONNECTS: &str = "ws_reconnects_total";
/// Liquidation alerts counter metric name.
pub const METRIC_LIQUIDATION_ALERTS: &str = "liquidation_alerts_total";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    describe_histogram!(
        METRIC_BATCH_APPLY_LATENCY,
        "Execution report batch application latency in milliseconds"
    );
    describe_histogram!(
        METRIC_WS_MESSAGE_LATENCY,
        "WebSocket message processing latency in milliseconds"
    );

    describe_counter!(
        METRIC_REPORTS_APPLIED,
        "Total number of execution reports applied"
    );
    describe_counter!(
        METRIC_REPORTS_DROPPED,
        "Total number of malformed execution reports dropped"
    );
    describe_counter!(METRIC_FILLS_PARTIAL, "Total number of partial fills");
    describe_counter!(METRIC_FILLS_COMPLETED, "Total number of terminal fills");
    describe_counter!(
        METRIC_FILLS_UNMATCHED,
        "Total number of fills that matched no tracked order"
    );
    describe_counter!(METRIC_ORDERS_CANCELED, "Total number of canceled orders");
    describe_counter!(
        METRIC_WS_MESSAGES_RECEIVED,
        "Total number of WebSocket messages received"
    );
    describe_counter!(
        METRIC_WS_RECONNECTS,
        "Total number of WebSocket reconnections"
    );
    describe_counter!(
        METRIC_LIQUIDATION_ALERTS,
        "Total number of liquidation alerts forwarded"
    );

    debug!("Metrics initialized");
}

/// Record batch application latency.
pub fn record_batch_apply_latency(start: Instant) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_BATCH_APPLY_LATENCY).record(latency_ms);
}

/// Record WebSocket message processing latency.
pub fn record_ws_message_latency(start: Instant) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_WS_MESSAGE_LATENCY).record(latency_ms);
}

/// Increment reports applied counter.
pub fn inc_reports_applied() {
    counter!(METRIC_REPORTS_APPLIED).increment(1);
}

/// Increment reports dropped counter.
pub fn inc_reports_dropped() {
    counter!(METRIC_REPORTS_DROPPED).increment(1);
}

/// Increment partial fills counter.
pub fn inc_fills_partial() {
    counter!(METRIC_FILLS_PARTIAL).increment(1);
}

/// Increment completed fills counter.
pub fn inc_fills_completed() {
    counter!(METRIC_FILLS_COMPLETED).increment(1);
}

/// Increment unmatched fills counter.
///
/// A persistently climbing rate here is the operational signal for a
/// possible desync with the exchange.
pub fn inc_fills_unmatched() {
    counter!(METRIC_FILLS_UNMATCHED).increment(1);
}

/// Increment canceled orders counter.
pub fn inc_orders_canceled() {
    counter!(METRIC_ORDERS_CANCELED).increment(1);
}

/// Increment WebSocket messages received counter.
pub fn inc_ws_messages_received() {
    counter!(METRIC_WS_MESSAGES_RECEIVED).increment(1);
}

/// Increment WebSocket reconnects counter.
pub fn inc_ws_reconnects() {
    counter!(METRIC_WS_RECONNECTS).increment(1);
}

/// Increment liquidation alerts counter.
pub fn inc_liquidation_alerts() {
    counter!(METRIC_LIQUIDATION_ALERTS).increment(1);
}

/// RAII guard for timing operations.
/// Automatically records latency when dropped.
pub struct LatencyTimer {
    start: Instant,
    metric_name: &'static str,
}

impl LatencyTimer {
    /// Create a new latency timer for the given metric.
    pub fn new(metric_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            metric_name,
        }
    }

    /// Get elapsed time in milliseconds (without recording).
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        let latency_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        histogram!(self.metric_name).record(latency_ms);
    }
}

/// Create a latency timer for batch application.
pub fn timer_batch_apply() -> LatencyTimer {
    LatencyTimer::new(METRIC_BATCH_APPLY_LATENCY)
}
