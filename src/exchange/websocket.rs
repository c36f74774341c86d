//! WebSocket client for the exchange realtime feed.
//!
//! Features:
//! - Automatic reconnection with exponential backoff
//! - Heartbeat/ping-pong handling
//! - Splits table messages into execution, trade, and liquidation events

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::error::WsError;
use crate::metrics;

use super::types::{ExecutionReport, Liquidation, Trade};

/// One delivered batch, routed by table.
///
/// The reconciliation ledger consumes `Executions`; the statistics
/// aggregators consume `Trades` and `Liquidations`. The splitter is the only
/// thing the siblings share.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// A batch of execution reports, in delivery order.
    Executions(Vec<ExecutionReport>),
    /// A batch of public trades.
    Trades(Vec<Trade>),
    /// A batch of liquidations.
    Liquidations(Vec<Liquidation>),
}

/// Raw table message envelope from the realtime feed.
#[derive(Debug, Clone, Deserialize)]
struct TableMessage {
    /// Table name, e.g. "execution", "trade", "liquidation".
    table: Option<String>,
    /// Row payload.
    data: Option<serde_json::Value>,
}

/// WebSocket subscription message.
#[derive(Debug, Serialize)]
struct SubscribeMessage {
    /// Operation name.
    op: String,
    /// Topics to subscribe to.
    args: Vec<String>,
}

/// Reconnection configuration for WebSocket.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Initial backoff delay in milliseconds.
    pub initial_delay_ms: u64,
    /// Maximum backoff delay in seconds.
    pub max_delay_s: u64,
    /// Backoff multiplier (e.g., 2.0 for exponential).
    pub backoff_multiplier: f64,
    /// Heartbeat interval in seconds.
    pub heartbeat_interval_s: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1000,
            max_delay_s: 30,
            backoff_multiplier: 2.0,
            heartbeat_interval_s: 30,
        }
    }
}

impl ReconnectConfig {
    /// Create from config values.
    pub fn from_config(max_delay_s: u64, heartbeat_interval_s: u64) -> Self {
        Self {
            max_delay_s,
            heartbeat_interval_s,
            ..Default::default()
        }
    }

    /// Calculate next delay with exponential backoff.
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let delay_ms = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        let max_delay_ms = self.max_delay_s * 1000;
        let clamped_ms = delay_ms.min(max_delay_ms as f64) as u64;
        Duration::from_millis(clamped_ms)
    }
}

/// Manages the realtime connection and splits the stream.
pub struct ExchangeWebSocket {
    /// WebSocket base URL.
    ws_url: String,
    /// Reconnection configuration.
    reconnect_config: ReconnectConfig,
    /// Connection state (atomic for thread safety).
    connected: Arc<AtomicBool>,
    /// Reconnection attempt counter.
    reconnect_attempts: Arc<AtomicU64>,
    /// Last successful message timestamp.
    last_message_time: Arc<std::sync::RwLock<Option<Instant>>>,
}

impl ExchangeWebSocket {
    /// Create a new WebSocket client.
    pub fn new(ws_url: String) -> Self {
        Self::with_reconnect_config(ws_url, ReconnectConfig::default())
    }

    /// Create with custom reconnection config.
    pub fn with_reconnect_config(ws_url: String, config: ReconnectConfig) -> Self {
        Self {
            ws_url,
            reconnect_config: config,
            connected: Arc::new(AtomicBool::new(false)),
            reconnect_attempts: Arc::new(AtomicU64::new(0)),
            last_message_time: Arc::new(std::sync::RwLock::new(None)),
        }
    }

    /// The topics the ledger and aggregators need for one symbol.
    pub fn topics(symbol: &str) -> Vec<String> {
        vec![
            "execution".to_string(),
            format!("trade:{symbol}"),
            format!("liquidation:{symbol}"),
        ]
    }

    /// Check if currently connected.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Get reconnection attempt count.
    pub fn reconnect_attempts(&self) -> u64 {
        self.reconnect_attempts.load(Ordering::SeqCst)
    }

    /// Check if connection appears stale (no messages in heartbeat interval).
    pub fn is_stale(&self) -> bool {
        if let Ok(time) = self.last_message_time.read() {
            if let Some(last) = *time {
                return last.elapsed()
                    > Duration::from_secs(self.reconnect_config.heartbeat_interval_s * 2);
            }
        }
        // No messages received yet - not stale
        false
    }

    /// Run the WebSocket connection, yielding split feed events.
    pub async fn run(
        &self,
        topics: Vec<String>,
    ) -> Result<impl futures::Stream<Item = FeedEvent> + '_, WsError> {
        let url = url::Url::parse(&self.ws_url)
            .map_err(|e| WsError::ConnectionFailed(format!("bad url {}: {}", self.ws_url, e)))?;

        info!(url = %url, topics = ?topics, "Connecting to WebSocket");

        let (ws_stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| WsError::ConnectionFailed(e.to_string()))?;

        self.connected.store(true, Ordering::SeqCst);
        self.reconnect_attempts.store(0, Ordering::SeqCst);

        let (mut write, read) = ws_stream.split();

        let subscribe_msg = SubscribeMessage {
            op: "subscribe".to_string(),
            args: topics.clone(),
        };

        let msg_json =
            serde_json::to_string(&subscribe_msg).map_err(|e| WsError::SendFailed(e.to_string()))?;

        write
            .send(Message::Text(msg_json))
            .await
            .map_err(|e| WsError::SendFailed(e.to_string()))?;

        info!("Subscribed to {} topics", topics.len());

        let connected = self.connected.clone();
        let last_msg_time = self.last_message_time.clone();

        let stream = read.filter_map(move |msg| {
            let connected = connected.clone();
            let last_msg_time = last_msg_time.clone();

            async move {
                // Update last message time on any message
                if let Ok(mut time) = last_msg_time.write() {
                    *time = Some(Instant::now());
                }

                match msg {
                    Ok(Message::Text(text)) => {
                        let start = Instant::now();
                        metrics::inc_ws_messages_received();
                        let result = process_message(&text);
                        metrics::record_ws_message_latency(start);
                        result
                    }
                    Ok(Message::Ping(_)) => {
                        debug!("Received ping");
                        // Note: tungstenite auto-responds to pings
                        None
                    }
                    Ok(Message::Pong(_)) => {
                        debug!("Received pong");
                        None
                    }
                    Ok(Message::Close(frame)) => {
                        warn!(frame = ?frame, "WebSocket closed");
                        connected.store(false, Ordering::SeqCst);
                        None
                    }
                    Ok(_) => None,
                    Err(e) => {
                        error!(error = %e, "WebSocket error");
                        connected.store(false, Ordering::SeqCst);
                        None
                    }
                }
            }
        });

        Ok(stream)
    }

    /// Run with automatic reconnection on disconnect.
    /// Returns a channel receiver that yields split feed events.
    pub async fn run_with_reconnect(
        self: Arc<Self>,
        topics: Vec<String>,
    ) -> mpsc::Receiver<FeedEvent> {
        let (tx, rx) = mpsc::channel(1000);

        let ws = self;

        tokio::spawn(async move {
            let mut attempt = 0u32;

            loop {
                info!(attempt = attempt, "Attempting WebSocket connection");

                match ws.run(topics.clone()).await {
                    Ok(stream) => {
                        attempt = 0; // Reset on successful connection

                        // Pin the stream to use with .next()
                        let mut stream = Box::pin(stream);

                        while let Some(event) = stream.next().await {
                            if tx.send(event).await.is_err() {
                                info!("Channel closed, stopping WebSocket");
                                return;
                            }
                        }

                        // Stream ended - connection closed
                        warn!("WebSocket stream ended, will reconnect");
                    }
                    Err(e) => {
                        error!(error = %e, attempt = attempt, "WebSocket connection failed");
                    }
                }

                // Calculate backoff delay
                let delay = ws.reconnect_config.next_delay(attempt);
                ws.reconnect_attempts.fetch_add(1, Ordering::SeqCst);
                metrics::inc_ws_reconnects();

                info!(delay_ms = delay.as_millis(), "Reconnecting after delay");
                tokio::time::sleep(delay).await;

                attempt = attempt.saturating_add(1);
            }
        });

        rx
    }
}

/// Route one text frame to the matching feed event.
///
/// Non-table frames (welcome, subscribe acks) and empty batches are dropped.
fn process_message(text: &str) -> Option<FeedEvent> {
    let message: TableMessage = serde_json::from_str(text).ok()?;
    let table = message.table?;
    let data = message.data?;

    match table.as_str() {
        "execution" => {
            let reports: Vec<ExecutionReport> = serde_json::from_value(data).ok()?;
            if reports.is_empty() {
                return None;
            }
            Some(FeedEvent::Executions(reports))
        }
        "trade" => {
            let trades: Vec<Trade> = serde_json::from_value(data).ok()?;
            if trades.is_empty() {
                return None;
            }
            Some(FeedEvent::Trades(trades))
        }
        "liquidation" => {
            let liqs: Vec<Liquidation> = serde_json::from_value(data).ok()?;
            if liqs.is_empty() {
                return None;
            }
            Some(FeedEvent::Liquidations(liqs))
        }
        other => {
            debug!(table = other, "Ignoring unsubscribed table");
            None
        }
    }
}
