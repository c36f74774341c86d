//! Per-batch trade flow statistics.
//!
//! Each WebSocket delivery of trades is recomputed from scratch; nothing
//! rolls over between batches except the previous batch's last price. The
//! aggregator is a sibling of the reconciliation ledger, fed by the same
//! stream splitter, and the two never read each other.

use std::sync::RwLock;

use rust_decimal::Decimal;
use smallvec::SmallVec;
use time::{Duration, OffsetDateTime};

use crate::exchange::{Side, Trade};

/// Trade batches are usually a handful of ticks; keep them on the stack.
type PriceBuf = SmallVec<[Decimal; 16]>;

#[derive(Debug)]
struct FlowState {
    length: usize,
    is_buy: bool,

    price: Decimal,
    ltp: Decimal,
    ask: Decimal,
    bid: Decimal,

    buy_size: i64,
    sell_size: i64,

    prices: PriceBuf,
    volumes: PriceBuf,

    delay: Duration,
}

impl Default for FlowState {
    fn default() -> Self {
        Self {
            length: 0,
            is_buy: false,
            price: Decimal::ZERO,
            ltp: Decimal::ZERO,
            ask: Decimal::ZERO,
            bid: Decimal::ZERO,
            buy_size: 0,
            sell_size: 0,
            prices: PriceBuf::new(),
            volumes: PriceBuf::new(),
            delay: Duration::ZERO,
        }
    }
}

impl FlowState {
    /// Track execution-derived best quotes: a buy taker prints the ask side,
    /// a sell taker prints the bid side.
    fn best(&mut self, side: Side, price: Decimal) {
        self.price = price;
        match side {
            Side::Buy => {
                self.ask = price;
                self.is_buy = true;
            }
            Side::Sell => {
                self.bid = price;
                self.is_buy = false;
            }
        }
    }
}

/// Rolling market statistics over the most recent trade batch.
///
/// Readers may query concurrently while a new batch is being applied; they
/// always observe one whole batch, never a partially applied one.
#[derive(Debug, Default)]
pub struct TradeFlow {
    state: RwLock<FlowState>,
}

impl TradeFlow {
    /// Create an empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute all statistics from one delivered batch of trades.
    pub fn apply(&self, trades: &[Trade]) {
        let mut state = self.state.write().expect("trade flow lock poisoned");

        state.length = trades.len();
        state.buy_size = 0;
        state.sell_size = 0;
        state.prices = PriceBuf::new();
        state.volumes = PriceBuf::new();

        if let Some(last) = trades.last() {
            state.delay = OffsetDateTime::now_utc() - last.timestamp;
        }

        // Park the previous batch's print before it is overwritten.
        state.ltp = state.price;

        for trade in trades {
            state.prices.push(trade.price);
            state.volumes.push(Decimal::from(trade.size));

            match Side::from_report(&trade.side) {
                Some(Side::Buy) => {
                    state.buy_size += trade.size;
                    state.best(Side::Buy, trade.price);
                }
                Some(Side::Sell) => {
                    state.sell_size += trade.size;
                    state.best(Side::Sell, trade.price);
                }
                None => {}
            }
        }
    }

    /// Number of trades in the last batch.
    pub fn len(&self) -> usize {
        self.read().length
    }

    /// Whether any batch has produced data yet.
    pub fn is_empty(&self) -> bool {
        self.read().length == 0
    }

    /// Whether the last print in the batch was buy-taker.
    pub fn is_buy(&self) -> bool {
        self.read().is_buy
    }

    /// Last traded price of the current batch.
    pub fn last_price(&self) -> Decimal {
        self.read().price
    }

    /// Last traded price of the previous batch.
    pub fn ltp(&self) -> Decimal {
        self.read().ltp
    }

    /// Taker volume of the batch: total, buy, sell.
    pub fn volume(&self) -> (i64, i64, i64) {
        let state = self.read();
        (
            state.buy_size + state.sell_size,
            state.buy_size,
            state.sell_size,
        )
    }

    /// Execution-derived best quotes: (ask, bid).
    pub fn best(&self) -> (Decimal, Decimal) {
        let state = self.read();
        (state.ask, state.bid)
    }

    /// Execution-derived spread, floored at zero.
    pub fn spread(&self) -> Decimal {
        let state = self.read();
        (state.ask - state.bid).max(Decimal::ZERO)
    }

    /// Reporting delay: receipt time minus the batch's last exchange
    /// timestamp.
    pub fn delay(&self) -> Duration {
        self.read().delay
    }

    /// Clone out the batch's price and volume series (VWAP/EMA inputs).
    pub fn series(&self) -> (Vec<Decimal>, Vec<Decimal>) {
        let state = self.read();
        (state.prices.to_vec(), state.volumes.to_vec())
    }

    /// Volume-weighted average price of the batch, if it traded.
    pub fn vwap(&self) -> Option<Decimal> {
        let state = self.read();
        let total: Decimal = state.volumes.iter().copied().sum();
        if total.is_zero() {
            return None;
        }
        let weighted: Decimal = state
            .prices
            .iter()
            .zip(state.volumes.iter())
            .map(|(p, v)| p * v)
            .sum();
        Some(weighted / total)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, FlowState> {
        self.state.read().expect("trade flow lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn trade(side: &str, size: i64, price: Decimal) -> Trade {
        Trade {
            symbol: "XBTUSD".to_string(),
            side: side.to_string(),
            size,
            price,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn apply_computes_volumes_and_bests() {
        let flow = TradeFlow::new();
        flow.apply(&[
            trade("Buy", 100, dec!(42000.5)),
            trade("Sell", 40, dec!(42000.0)),
            trade("Buy", 60, dec!(42001.0)),
        ]);

        assert_eq!(flow.len(), 3);
        assert_eq!(flow.volume(), (200, 160, 40));
        assert_eq!(flow.best(), (dec!(42001.0), dec!(42000.0)));
        assert_eq!(flow.spread(), dec!(1.0));
        assert_eq!(flow.last_price(), dec!(42001.0));
        assert!(flow.is_buy());
    }

    #[test]
    fn ltp_carries_previous_batch_print() {
        let flow = TradeFlow::new();
        flow.apply(&[trade("Buy", 10, dec!(100))]);
        assert_eq!(flow.ltp(), Decimal::ZERO);

        flow.apply(&[trade("Sell", 10, dec!(99))]);
        assert_eq!(flow.ltp(), dec!(100));
        assert_eq!(flow.last_price(), dec!(99));
        assert!(!flow.is_buy());
    }

    #[test]
    fn spread_floors_at_zero() {
        let flow = TradeFlow::new();
        // Only sells seen: ask stays zero, bid positive.
        flow.apply(&[trade("Sell", 10, dec!(99))]);
        assert_eq!(flow.spread(), Decimal::ZERO);
    }

    #[test]
    fn vwap_weights_by_volume() {
        let flow = TradeFlow::new();
        flow.apply(&[trade("Buy", 1, dec!(100)), trade("Buy", 3, dec!(200))]);

        assert_eq!(flow.vwap(), Some(dec!(175)));
    }

    #[test]
    fn vwap_none_for_empty_batch() {
        let flow = TradeFlow::new();
        flow.apply(&[]);
        assert_eq!(flow.vwap(), None);
        assert_eq!(flow.len(), 0);
    }

    #[test]
    fn unknown_taker_side_still_recorded_in_series() {
        let flow = TradeFlow::new();
        flow.apply(&[trade("Unknown", 5, dec!(100))]);

        // Not netted, but the print is kept for the series.
        assert_eq!(flow.volume(), (0, 0, 0));
        let (prices, volumes) = flow.series();
        assert_eq!(prices, vec![dec!(100)]);
        assert_eq!(volumes, vec![dec!(5)]);
    }
}
