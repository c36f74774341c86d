//! Instrument tick-size table and price normalization.

use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::exchange::Instrument;

/// Minimum order size as a fraction of the last traded price.
const MIN_SIZE_RATIO: Decimal = Decimal::from_parts(25, 0, 0, false, 4); // 0.0025

/// Maximum price precision kept after alignment (1 satoshi).
const PRICE_SCALE: u32 = 8;

/// Tick sizes for the venue's open instruments, keyed by symbol.
#[derive(Debug, Clone, Default)]
pub struct TickTable {
    instruments: HashMap<String, Instrument>,
}

impl TickTable {
    /// Build a table from an instrument listing.
    pub fn new(instruments: impl IntoIterator<Item = Instrument>) -> Self {
        Self {
            instruments: instruments
                .into_iter()
                .map(|i| (i.symbol.clone(), i))
                .collect(),
        }
    }

    /// Minimum price increment for a symbol.
    pub fn tick_size(&self, symbol: &str) -> Option<Decimal> {
        self.instruments.get(symbol).map(|i| i.tick_size)
    }

    /// Round a price to the instrument's minimum increment.
    ///
    /// Midpoints round to the even tick; the result is truncated to satoshi
    /// precision. Unknown symbols (and degenerate tick sizes) pass the price
    /// through unchanged.
    pub fn align_price(&self, symbol: &str, price: Decimal) -> Decimal {
        let Some(tick) = self.tick_size(symbol) else {
            return price;
        };
        if tick <= Decimal::ZERO {
            return price;
        }

        let ticks =
            (price / tick).round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);
        (ticks * tick).trunc_with_scale(PRICE_SCALE)
    }

    /// Number of known instruments.
    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }
}

/// Venue minimum order size at the given last traded price.
pub fn min_qty(last_price: Decimal) -> i64 {
    (last_price * MIN_SIZE_RATIO)
        .ceil()
        .to_i64()
        .unwrap_or(0)
}
