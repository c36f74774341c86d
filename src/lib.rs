//! Live order and position reconciliation for streamed execution reports.
//!
//! The ledger consumes the exchange's execution report stream and keeps
//! three consistent views of a client's trading state:
//!
//! ```text
//! "New"        -> Orders (resting, signed quantity)
//! "Partially"  -> Orders shrinks, Positions accumulates
//! "Filled"     -> Orders entry moves entirely into Positions
//! "Canceled"   -> Orders entry replaced by a tombstone in Cancels
//! ```
//!
//! Trade and liquidation ticks from the same feed are aggregated separately
//! into per-batch market statistics; the two consumers never read each other.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`exchange`]: Wire schema, REST client, and WebSocket feed splitter
//! - [`ledger`]: Order records, concurrent collections, reconciliation engine
//! - [`stats`]: Trade flow and liquidation aggregation
//! - [`instrument`]: Tick-size table and price alignment
//! - [`api`]: HTTP API for health/state/metrics
//! - [`utils`]: Utility functions

pub mod api;
pub mod config;
pub mod error;
pub mod exchange;
pub mod instrument;
pub mod ledger;
pub mod metrics;
pub mod stats;
pub mod utils;

pub use config::Config;
pub use error::{LedgerError, Result};
