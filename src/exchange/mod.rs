//! Exchange connectivity: wire schema, REST instrument listing, and the
//! WebSocket feed that splits the stream into executions, trades, and
//! liquidations.

pub mod client;
pub mod types;
pub mod websocket;

pub use client::ExchangeClient;
pub use types::{
    side_sign, ExecutionReport, Instrument, Liquidation, OrderStatus, Side, Trade,
};
pub use websocket::{ExchangeWebSocket, FeedEvent, ReconnectConfig};
