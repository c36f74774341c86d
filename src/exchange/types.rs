//! Wire-level types for the exchange execution/trade/liquidation feeds.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use time::OffsetDateTime;

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum Side {
    /// Buy order.
    #[strum(serialize = "Buy", serialize = "buy", serialize = "BUY")]
    Buy,
    /// Sell order.
    #[strum(serialize = "Sell", serialize = "sell", serialize = "SELL")]
    Sell,
}

impl Side {
    /// Signed multiplier: +1 for buys, -1 for sells.
    pub fn sign(&self) -> i64 {
        match self {
            Side::Buy => 1,
            Side::Sell => -1,
        }
    }

    /// Parse a side from a report string by case-insensitive prefix.
    ///
    /// Exchange report fields occasionally carry suffixed values
    /// ("BuyMinusTick" and friends), so only the prefix is significant.
    pub fn from_report(s: &str) -> Option<Side> {
        let lower = s.to_ascii_lowercase();
        if lower.starts_with("buy") {
            Some(Side::Buy)
        } else if lower.starts_with("sell") {
            Some(Side::Sell)
        } else {
            None
        }
    }
}

/// Signed multiplier for a raw side string: +1 buy, -1 sell, 0 unrecognized.
///
/// A 0 result means the value can never be netted; callers decide whether
/// that is an error (the engine treats it as one).
pub fn side_sign(s: &str) -> i64 {
    Side::from_report(s).map(|side| side.sign()).unwrap_or(0)
}

/// Order status as reported on the execution stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum OrderStatus {
    /// Order accepted and resting on the book.
    #[strum(serialize = "New", serialize = "new")]
    New,
    /// Order partially filled, remainder still resting.
    #[strum(
        serialize = "Partially",
        serialize = "PartiallyFilled",
        serialize = "partially"
    )]
    PartiallyFilled,
    /// Order fully filled.
    #[strum(serialize = "Filled", serialize = "filled")]
    Filled,
    /// Order canceled by the client or the exchange.
    #[strum(serialize = "Canceled", serialize = "Cancelled", serialize = "canceled")]
    Canceled,
    /// Order rejected before reaching the book.
    #[strum(serialize = "Rejected", serialize = "rejected")]
    Rejected,
    /// Order expired (time-in-force ran out).
    #[strum(serialize = "Expired", serialize = "expired")]
    Expired,
    /// Terminal catch-all some venues emit instead of Canceled.
    #[strum(serialize = "Done", serialize = "done")]
    Done,
}

impl OrderStatus {
    /// Check if status is terminal (won't change).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled
                | OrderStatus::Canceled
                | OrderStatus::Rejected
                | OrderStatus::Expired
                | OrderStatus::Done
        )
    }
}

/// One execution report from the exchange's `execution` stream.
///
/// Field names follow the venue's camelCase convention; aliases cover the
/// variants seen across REST and WebSocket payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Exchange-assigned order identifier.
    #[serde(alias = "orderID", alias = "orderId", default)]
    pub order_id: Option<String>,
    /// Instrument symbol.
    #[serde(default)]
    pub symbol: Option<String>,
    /// Side string, e.g. "Buy" / "Sell".
    #[serde(default)]
    pub side: Option<String>,
    /// Report status string, e.g. "New", "Partially", "Filled".
    #[serde(alias = "ordStatus", default)]
    pub ord_status: Option<String>,
    /// The contract quantity this report represents on the order's side.
    #[serde(alias = "orderQty", default)]
    pub order_qty: Option<i64>,
    /// Execution price, when present.
    #[serde(default)]
    pub price: Option<Decimal>,
    /// Exchange timestamp of the report.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub timestamp: Option<OffsetDateTime>,
}

impl ExecutionReport {
    /// Parse the status field, if present and recognized.
    pub fn status(&self) -> Option<OrderStatus> {
        self.ord_status.as_deref().and_then(|s| s.parse().ok())
    }
}

/// One public trade tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    /// Instrument symbol.
    pub symbol: String,
    /// Taker side string.
    pub side: String,
    /// Contracts traded.
    pub size: i64,
    /// Trade price.
    pub price: Decimal,
    /// Exchange timestamp of the trade.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// One liquidation (forced close) tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Liquidation {
    /// Liquidation order identifier.
    #[serde(alias = "orderID", alias = "orderId", default)]
    pub order_id: Option<String>,
    /// Instrument symbol.
    pub symbol: String,
    /// Side of the liquidation order.
    pub side: String,
    /// Liquidation price, when present.
    #[serde(default)]
    pub price: Option<Decimal>,
    /// Remaining quantity being liquidated.
    #[serde(alias = "leavesQty", default)]
    pub leaves_qty: i64,
}

/// An open instrument listing from the REST API.
#[derive(Debug, Clone, Deserialize)]
pub struct Instrument {
    /// Instrument symbol.
    pub symbol: String,
    /// Minimum price increment.
    #[serde(alias = "tickSize")]
    pub tick_size: Decimal,
    /// Listing state, e.g. "Open".
    #[serde(default)]
    pub state: Option<String>,
}
