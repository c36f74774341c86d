//! Liquidation batch aggregation.

use serde::Serialize;
use time::OffsetDateTime;

use crate::exchange::{side_sign, Liquidation, Side};

/// One delivered batch of liquidations, netted into a single alert.
#[derive(Debug, Clone, Serialize)]
pub struct LiquidationAlert {
    /// Sum of the batch's side signs; positive means buy-side liquidations
    /// dominated.
    pub net_side: i64,
    /// Total remaining quantity being force-closed across the batch.
    pub volume: i64,
    /// When the alert was built (receipt time, not exchange time).
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl LiquidationAlert {
    /// The dominating side of the sweep, if one dominated at all.
    pub fn dominant_side(&self) -> Option<Side> {
        match self.net_side {
            n if n > 0 => Some(Side::Buy),
            n if n < 0 => Some(Side::Sell),
            _ => None,
        }
    }
}

/// Net a batch of liquidation ticks into one alert.
///
/// Empty batches produce nothing; the feed only forwards an alert when the
/// exchange actually liquidated someone.
pub fn aggregate(liqs: &[Liquidation]) -> Option<LiquidationAlert> {
    if liqs.is_empty() {
        return None;
    }

    let mut net_side = 0i64;
    let mut volume = 0i64;
    for liq in liqs {
        net_side += side_sign(&liq.side);
        volume += liq.leaves_qty;
    }

    Some(LiquidationAlert {
        net_side,
        volume,
        created_at: OffsetDateTime::now_utc(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn liq(side: &str, leaves_qty: i64) -> Liquidation {
        Liquidation {
            order_id: None,
            symbol: "XBTUSD".to_string(),
            side: side.to_string(),
            price: None,
            leaves_qty,
        }
    }

    #[test]
    fn aggregate_nets_sides_and_sums_volume() {
        let alert = aggregate(&[liq("Buy", 100), liq("Buy", 50), liq("Sell", 30)]).unwrap();

        assert_eq!(alert.net_side, 1);
        assert_eq!(alert.volume, 180);
        assert_eq!(alert.dominant_side(), Some(Side::Buy));
    }

    #[test]
    fn aggregate_balanced_batch_has_no_dominant_side() {
        let alert = aggregate(&[liq("Buy", 10), liq("Sell", 10)]).unwrap();
        assert_eq!(alert.net_side, 0);
        assert_eq!(alert.dominant_side(), None);
        assert_eq!(alert.volume, 20);
    }

    #[test]
    fn aggregate_empty_batch_is_none() {
        assert!(aggregate(&[]).is_none());
    }

    #[test]
    fn aggregate_ignores_unrecognized_sides_for_netting() {
        let alert = aggregate(&[liq("?", 40), liq("Sell", 10)]).unwrap();
        assert_eq!(alert.net_side, -1);
        assert_eq!(alert.volume, 50);
    }
}
