//! Unified error types for the ledger.

use thiserror::Error;

/// Unified error type for the ledger.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Execution report error.
    #[error("report error: {0}")]
    Report(#[from] ReportError),

    /// WebSocket error.
    #[error("websocket error: {0}")]
    WebSocket(#[from] WsError),

    /// HTTP request error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while classifying a single execution report.
///
/// None of these are fatal to the engine: a bad report is skipped and batch
/// processing continues with the next report.
#[derive(Error, Debug)]
pub enum ReportError {
    /// A required field is absent from the report.
    #[error("malformed report: missing {field}")]
    MalformedReport {
        /// Name of the missing field.
        field: &'static str,
    },

    /// The side string matched neither "buy" nor "sell".
    #[error("unrecognized side {side:?} for order {order_id}")]
    UnrecognizedSide {
        /// Order the report referred to.
        order_id: String,
        /// The offending side string.
        side: String,
    },

    /// The status string is not one the transition table knows.
    #[error("unknown order status {status:?} for order {order_id}")]
    UnknownStatus {
        /// Order the report referred to.
        order_id: String,
        /// The offending status string.
        status: String,
    },
}

/// WebSocket connection and message errors.
#[derive(Error, Debug)]
pub enum WsError {
    /// Connection failed.
    #[error("websocket connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection closed unexpectedly.
    #[error("websocket connection closed: code={code:?}, reason={reason}")]
    ConnectionClosed {
        /// Close code.
        code: Option<u16>,
        /// Close reason.
        reason: String,
    },

    /// Message parsing failed.
    #[error("failed to parse websocket message: {0}")]
    ParseError(String),

    /// Send failed.
    #[error("failed to send websocket message: {0}")]
    SendFailed(String),

    /// Tungstenite error.
    #[error("tungstenite error: {0}")]
    Tungstenite(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, LedgerError>;
