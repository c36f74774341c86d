//! Exchange REST client.

use tracing::{debug, instrument};

use crate::config::Config;
use crate::error::Result;

use super::types::Instrument;

/// Thin REST wrapper for the endpoints the ledger needs (instrument
/// listings; the live data all arrives over the WebSocket feed).
#[derive(Debug, Clone)]
pub struct ExchangeClient {
    /// HTTP client for API requests.
    http: reqwest::Client,
    /// Base URL for the REST API.
    rest_url: String,
}

impl ExchangeClient {
    /// Create a new client from config with low-latency HTTP settings.
    pub fn new(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.http_timeout_ms))
            .connect_timeout(std::time::Duration::from_millis(500))
            .tcp_nodelay(true)
            .tcp_keepalive(std::time::Duration::from_secs(30))
            .build()
            .expect("failed to create HTTP client");

        Self {
            http,
            rest_url: config.exchange_rest_url.clone(),
        }
    }

    /// Get the HTTP client reference.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Fetch the venue's open instruments (symbol + tick size).
    #[instrument(skip(self))]
    pub async fn get_instruments(&self) -> Result<Vec<Instrument>> {
        let url = format!("{}/instrument", self.rest_url.trim_end_matches('/'));

        let response = self
            .http
            .get(&url)
            .query(&[("filter", r#"{"state": "Open"}"#)])
            .send()
            .await?
            .error_for_status()?;

        let mut instruments: Vec<Instrument> = response.json().await?;
        instruments.retain(|i| i.state.as_deref().unwrap_or("Open") == "Open");

        debug!(count = instruments.len(), "Fetched instrument listing");
        Ok(instruments)
    }
}
