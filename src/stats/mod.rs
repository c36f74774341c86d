//! Market statistics aggregated from the public trade and liquidation feeds.

pub mod liquidations;
pub mod trades;

pub use liquidations::{aggregate, LiquidationAlert};
pub use trades::TradeFlow;
