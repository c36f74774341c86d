//! Application configuration loaded from environment variables.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Exchange Endpoints ===
    /// WebSocket realtime feed base URL.
    #[serde(default = "default_ws_url")]
    pub exchange_ws_url: String,

    /// REST API base URL.
    #[serde(default = "default_rest_url")]
    pub exchange_rest_url: String,

    // === Tracking Parameters ===
    /// Instrument symbol to subscribe for trades/liquidations.
    #[serde(default = "default_symbol")]
    pub symbol: String,

    /// Percentage of oldest identities swept from each collection when an
    /// eviction is requested.
    #[serde(default = "default_evict_percent")]
    pub evict_percent: u32,

    // === HTTP Client ===
    /// Request timeout in milliseconds.
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,

    // === WebSocket Configuration ===
    /// Maximum reconnect backoff delay in seconds.
    #[serde(default = "default_ws_max_delay")]
    pub ws_reconnect_max_delay_s: u64,

    /// Heartbeat interval in seconds (staleness detection).
    #[serde(default = "default_ws_heartbeat")]
    pub ws_heartbeat_interval_s: u64,

    // === Server Configuration ===
    /// HTTP server port for health/state/metrics endpoints.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Enable verbose logging.
    #[serde(default)]
    pub verbose: bool,
}

fn default_ws_url() -> String {
    "wss://ws.bitmex.com/realtime".to_string()
}

fn default_rest_url() -> String {
    "https://www.bitmex.com/api/v1".to_string()
}

fn default_symbol() -> String {
    "XBTUSD".to_string()
}

fn default_evict_percent() -> u32 {
    30
}

fn default_http_timeout_ms() -> u64 {
    5000
}

fn default_ws_max_delay() -> u64 {
    30
}

fn default_ws_heartbeat() -> u64 {
    30
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if self.symbol.is_empty() {
            return Err("SYMBOL is required".to_string());
        }

        if self.evict_percent > 100 {
            return Err("EVICT_PERCENT must be at most 100".to_string());
        }

        if !self.exchange_ws_url.starts_with("ws") {
            return Err("EXCHANGE_WS_URL must be a ws:// or wss:// URL".to_string());
        }

        Ok(())
    }
}
