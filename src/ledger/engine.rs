//! Reconciliation engine: the state machine that moves an order between the
//! open, canceled, and position collections as execution reports arrive.

use tracing::{debug, instrument, warn};

use super::order::{OrderId, OrderRecord};
use super::table::OrderTable;
use crate::error::ReportError;
use crate::exchange::{ExecutionReport, OrderStatus, Side};
use crate::metrics;

/// Per-report transition outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The fill could not be attributed to a tracked order; nothing mutated.
    NotExist,
    /// A new order is resting on the board.
    OnBoard,
    /// Partial fill; a reduced remainder is still resting.
    Partial,
    /// Terminal fill; the order moved entirely into positions.
    Completed,
    /// The order was canceled, rejected, or otherwise taken off the board.
    Canceled,
    /// The order expired off the board.
    Expired,
}

/// Tracks a client's live orders and resulting positions against the
/// execution report stream.
///
/// Three collections, one lifecycle: a record enters `orders` on "New",
/// shrinks in place on each partial fill while the filled amount accumulates
/// in `positions`, and leaves `orders` for `positions` on a terminal fill or
/// for `cancels` on cancel/expire. `cancels` holds tombstones only, as a
/// negative cache.
///
/// Individual collection operations are thread-safe, so display readers may
/// inspect state while a batch is being applied. A multi-step transition is
/// NOT atomic across collections: a concurrent reader can momentarily observe
/// an identity in neither `orders` nor `positions`, or in both. Callers that
/// need strict cross-collection consistency must serialize access around the
/// engine themselves.
#[derive(Debug, Default)]
pub struct Ledger {
    orders: OrderTable,
    cancels: OrderTable,
    positions: OrderTable,
}

impl Ledger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resting (not yet fully filled) orders.
    pub fn orders(&self) -> &OrderTable {
        &self.orders
    }

    /// Tombstones for canceled/expired orders.
    pub fn cancels(&self) -> &OrderTable {
        &self.cancels
    }

    /// Accumulated filled quantity per originating order identity.
    ///
    /// This is an order-indexed running fill total, not a per-instrument net
    /// position; aggregate across identities for a symbol-level view.
    pub fn positions(&self) -> &OrderTable {
        &self.positions
    }

    /// Apply a delivered batch of execution reports, strictly in delivery
    /// order, returning the outcome of each applied report.
    ///
    /// Malformed or unrecognized reports are logged, counted, and skipped;
    /// the batch always runs to the end.
    #[instrument(skip_all, fields(batch = reports.len()))]
    pub fn apply_reports(&self, reports: &[ExecutionReport]) -> Vec<Outcome> {
        let mut outcomes = Vec::with_capacity(reports.len());

        for report in reports {
            match self.apply_report(report) {
                Ok(outcome) => {
                    metrics::inc_reports_applied();
                    if outcome == Outcome::NotExist {
                        metrics::inc_fills_unmatched();
                    }
                    outcomes.push(outcome);
                }
                Err(e) => {
                    warn!(error = %e, "Dropping execution report");
                    metrics::inc_reports_dropped();
                }
            }
        }

        outcomes
    }

    /// Classify one execution report and run the matching transition.
    pub fn apply_report(&self, report: &ExecutionReport) -> Result<Outcome, ReportError> {
        let order_id = report
            .order_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(ReportError::MalformedReport { field: "orderID" })?;

        let status_str = report.ord_status.as_deref().ok_or(ReportError::MalformedReport {
            field: "ordStatus",
        })?;
        let status: OrderStatus =
            status_str
                .parse()
                .map_err(|_| ReportError::UnknownStatus {
                    order_id: order_id.to_string(),
                    status: status_str.to_string(),
                })?;

        let id = OrderId::from(order_id);

        match status {
            OrderStatus::New => {
                let record = OrderRecord::from_report(report)?;
                debug!(order_id = %record.order_id, qty = record.signed_qty, "Order on board");
                self.orders.insert(record);
                Ok(Outcome::OnBoard)
            }

            // Defensive double-delete; both removes are idempotent.
            OrderStatus::Rejected => {
                self.orders.remove(&id);
                self.cancels.remove(&id);
                Ok(Outcome::Canceled)
            }

            OrderStatus::Filled | OrderStatus::PartiallyFilled => {
                let (side, qty) = fill_fields(order_id, report)?;
                Ok(self.fill(&id, side, qty))
            }

            OrderStatus::Canceled | OrderStatus::Done => Ok(self.cancel(&id)),

            OrderStatus::Expired => {
                self.cancel(&id);
                Ok(Outcome::Expired)
            }
        }
    }

    /// Apply a single fill or cancel when only identity, side, and quantity
    /// are known, without a full report.
    pub fn apply_fill(&self, order_id: &OrderId, is_cancel: bool, side: Side, qty: i64) -> Outcome {
        if is_cancel {
            return self.cancel(order_id);
        }
        self.fill(order_id, side, qty)
    }

    /// Fill-matching: attribute a (possibly partial) fill to a resting order.
    ///
    /// The delta is applied with the report's own sign; the stored remainder
    /// shrinks toward zero from whichever side it rests on.
    fn fill(&self, order_id: &OrderId, side: Side, qty: i64) -> Outcome {
        let Some(order) = self.orders.get(order_id) else {
            return Outcome::NotExist;
        };

        let remaining = order.signed_qty - side.sign() * qty;
        if remaining * side.sign() > 0 {
            self.partial(order, remaining, qty)
        } else {
            self.complete(order, qty)
        }
    }

    /// A remainder still rests: shrink the open order in place and
    /// accumulate the filled amount into positions.
    fn partial(&self, order: OrderRecord, remaining: i64, qty: i64) -> Outcome {
        let filled = match self.accumulated_fill(&order, qty) {
            Some(f) => f,
            None => return Outcome::NotExist,
        };

        // Re-store the remainder so subsequent reports keep matching this
        // identity; the status flip is what later fills key off to combine.
        self.orders.insert(OrderRecord {
            signed_qty: remaining,
            status: OrderStatus::PartiallyFilled,
            ..order.clone()
        });

        self.positions.insert(OrderRecord {
            signed_qty: filled,
            status: OrderStatus::PartiallyFilled,
            ..order
        });

        metrics::inc_fills_partial();
        Outcome::Partial
    }

    /// The order is fully consumed: move it out of orders and store the
    /// final accumulated quantity into positions.
    fn complete(&self, order: OrderRecord, qty: i64) -> Outcome {
        self.orders.remove(&order.order_id);

        let filled = match self.accumulated_fill(&order, qty) {
            Some(f) => f,
            None => return Outcome::NotExist,
        };

        self.positions.insert(OrderRecord {
            signed_qty: filled,
            status: OrderStatus::Filled,
            ..order
        });

        metrics::inc_fills_completed();
        Outcome::Completed
    }

    /// Filled quantity for positions: the report's own quantity, combined
    /// with the prior accumulation when the order was already partially
    /// filled, re-signed by the order's side.
    fn accumulated_fill(&self, order: &OrderRecord, qty: i64) -> Option<i64> {
        if order.status == OrderStatus::PartiallyFilled {
            let prior = self.positions.get(&order.order_id)?;
            Some((prior.signed_qty.abs() + qty.abs()) * order.side.sign())
        } else {
            Some(qty.abs() * order.side.sign())
        }
    }

    /// Take an order off the board and leave a tombstone. Idempotent.
    fn cancel(&self, order_id: &OrderId) -> Outcome {
        self.orders.remove(order_id);
        self.cancels.insert(OrderRecord::tombstone(order_id.clone()));
        metrics::inc_orders_canceled();
        Outcome::Canceled
    }
}

/// Extract the side and quantity a fill report must carry.
fn fill_fields(order_id: &str, report: &ExecutionReport) -> Result<(Side, i64), ReportError> {
    let side_str = report
        .side
        .as_deref()
        .ok_or(ReportError::MalformedReport { field: "side" })?;
    let side = Side::from_report(side_str).ok_or_else(|| ReportError::UnrecognizedSide {
        order_id: order_id.to_string(),
        side: side_str.to_string(),
    })?;
    let qty = report
        .order_qty
        .ok_or(ReportError::MalformedReport { field: "orderQty" })?;
    Ok((side, qty))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn report(order_id: &str, side: &str, status: &str, qty: i64) -> ExecutionReport {
        ExecutionReport {
            order_id: Some(order_id.to_string()),
            symbol: Some("XBTUSD".to_string()),
            side: Some(side.to_string()),
            ord_status: Some(status.to_string()),
            order_qty: Some(qty),
            price: None,
            timestamp: None,
        }
    }

    #[test]
    fn new_report_rests_on_board() {
        let ledger = Ledger::new();
        let outcome = ledger.apply_report(&report("a", "Buy", "New", 10)).unwrap();

        assert_eq!(outcome, Outcome::OnBoard);
        let rec = ledger.orders().get(&OrderId::from("a")).unwrap();
        assert_eq!(rec.signed_qty, 10);
        assert_eq!(rec.status, OrderStatus::New);
        assert!(ledger.positions().is_empty());
        assert!(ledger.cancels().is_empty());
    }

    #[test]
    fn full_fill_moves_order_to_positions() {
        let ledger = Ledger::new();
        ledger.apply_report(&report("a", "Buy", "New", 10)).unwrap();
        let outcome = ledger.apply_report(&report("a", "Buy", "Filled", 10)).unwrap();

        assert_eq!(outcome, Outcome::Completed);
        assert!(ledger.orders().get(&OrderId::from("a")).is_none());

        let pos = ledger.positions().get(&OrderId::from("a")).unwrap();
        assert_eq!(pos.signed_qty, 10);
        assert_eq!(pos.status, OrderStatus::Filled);
    }

    #[test]
    fn sell_full_fill_keeps_negative_sign() {
        let ledger = Ledger::new();
        ledger.apply_report(&report("s", "Sell", "New", 10)).unwrap();
        let outcome = ledger
            .apply_report(&report("s", "Sell", "Filled", 10))
            .unwrap();

        assert_eq!(outcome, Outcome::Completed);
        let pos = ledger.positions().get(&OrderId::from("s")).unwrap();
        assert_eq!(pos.signed_qty, -10);
        assert!(pos.sign_matches_side());
    }

    #[test]
    fn partial_fills_accumulate_until_complete() {
        let ledger = Ledger::new();
        let id = OrderId::from("a");
        ledger.apply_report(&report("a", "Buy", "New", 10)).unwrap();

        let first = ledger
            .apply_report(&report("a", "Buy", "Partially", 4))
            .unwrap();
        assert_eq!(first, Outcome::Partial);

        let resting = ledger.orders().get(&id).unwrap();
        assert_eq!(resting.signed_qty, 6);
        assert_eq!(resting.status, OrderStatus::PartiallyFilled);
        let pos = ledger.positions().get(&id).unwrap();
        assert_eq!(pos.signed_qty, 4);

        let second = ledger
            .apply_report(&report("a", "Buy", "Partially", 6))
            .unwrap();
        assert_eq!(second, Outcome::Completed);

        assert!(ledger.orders().get(&id).is_none());
        let pos = ledger.positions().get(&id).unwrap();
        assert_eq!(pos.signed_qty, 10);
        assert_eq!(pos.status, OrderStatus::Filled);
    }

    #[test]
    fn sell_partial_fills_accumulate_negative() {
        let ledger = Ledger::new();
        let id = OrderId::from("s");
        ledger.apply_report(&report("s", "Sell", "New", 10)).unwrap();

        ledger
            .apply_report(&report("s", "Sell", "Partially", 3))
            .unwrap();
        assert_eq!(ledger.orders().get(&id).unwrap().signed_qty, -7);
        assert_eq!(ledger.positions().get(&id).unwrap().signed_qty, -3);

        ledger
            .apply_report(&report("s", "Sell", "Partially", 7))
            .unwrap();
        assert!(ledger.orders().get(&id).is_none());
        assert_eq!(ledger.positions().get(&id).unwrap().signed_qty, -10);
    }

    #[test]
    fn sign_invariant_holds_through_lifecycle() {
        let ledger = Ledger::new();
        ledger.apply_report(&report("a", "Buy", "New", 8)).unwrap();
        ledger
            .apply_report(&report("a", "Buy", "Partially", 5))
            .unwrap();

        for rec in ledger
            .orders()
            .snapshot()
            .into_iter()
            .chain(ledger.positions().snapshot())
        {
            assert!(rec.sign_matches_side(), "bad sign: {:?}", rec);
        }
    }

    #[test]
    fn fill_for_untracked_order_is_not_exist() {
        let ledger = Ledger::new();
        let outcome = ledger
            .apply_report(&report("ghost", "Buy", "Filled", 10))
            .unwrap();

        assert_eq!(outcome, Outcome::NotExist);
        assert!(ledger.orders().is_empty());
        assert!(ledger.cancels().is_empty());
        assert!(ledger.positions().is_empty());
    }

    #[test]
    fn cancel_leaves_tombstone_and_is_idempotent() {
        let ledger = Ledger::new();
        let id = OrderId::from("a");
        ledger.apply_report(&report("a", "Buy", "New", 10)).unwrap();

        let first = ledger
            .apply_report(&report("a", "Buy", "Canceled", 0))
            .unwrap();
        assert_eq!(first, Outcome::Canceled);
        assert!(ledger.orders().get(&id).is_none());
        assert!(ledger.cancels().contains(&id));

        let second = ledger
            .apply_report(&report("a", "Buy", "Canceled", 0))
            .unwrap();
        assert_eq!(second, Outcome::Canceled);
        assert_eq!(ledger.cancels().len(), 1);
    }

    #[test]
    fn expired_report_tombstones_with_expired_outcome() {
        let ledger = Ledger::new();
        ledger.apply_report(&report("a", "Sell", "New", 5)).unwrap();

        let outcome = ledger
            .apply_report(&report("a", "Sell", "Expired", 0))
            .unwrap();
        assert_eq!(outcome, Outcome::Expired);
        assert!(ledger.cancels().contains(&OrderId::from("a")));
    }

    #[test]
    fn done_report_cancels() {
        let ledger = Ledger::new();
        ledger.apply_report(&report("a", "Buy", "New", 5)).unwrap();
        let outcome = ledger.apply_report(&report("a", "Buy", "Done", 0)).unwrap();
        assert_eq!(outcome, Outcome::Canceled);
    }

    #[test]
    fn rejected_clears_orders_and_cancels() {
        let ledger = Ledger::new();
        let id = OrderId::from("a");
        ledger.apply_report(&report("a", "Buy", "New", 5)).unwrap();
        ledger
            .apply_report(&report("a", "Buy", "Canceled", 0))
            .unwrap();
        assert!(ledger.cancels().contains(&id));

        let outcome = ledger
            .apply_report(&report("a", "Buy", "Rejected", 0))
            .unwrap();
        assert_eq!(outcome, Outcome::Canceled);
        assert!(!ledger.orders().contains(&id));
        assert!(!ledger.cancels().contains(&id));

        // Rejecting an untracked identity is fine too.
        assert!(ledger
            .apply_report(&report("ghost", "Buy", "Rejected", 0))
            .is_ok());
    }

    #[test]
    fn unrecognized_side_is_an_error_not_a_silent_drop() {
        let ledger = Ledger::new();
        ledger.apply_report(&report("a", "Buy", "New", 10)).unwrap();

        let err = ledger
            .apply_report(&report("a", "Hold", "Filled", 10))
            .unwrap_err();
        assert!(matches!(err, ReportError::UnrecognizedSide { .. }));

        // Nothing mutated.
        assert_eq!(ledger.orders().get(&OrderId::from("a")).unwrap().signed_qty, 10);
    }

    #[test]
    fn unknown_status_is_an_error() {
        let ledger = Ledger::new();
        let err = ledger
            .apply_report(&report("a", "Buy", "Resting", 10))
            .unwrap_err();
        assert!(matches!(err, ReportError::UnknownStatus { .. }));
    }

    #[test]
    fn batch_skips_bad_reports_and_continues() {
        let ledger = Ledger::new();
        let mut missing_status = report("b", "Buy", "New", 5);
        missing_status.ord_status = None;

        let outcomes = ledger.apply_reports(&[
            report("a", "Buy", "New", 10),
            missing_status,
            report("a", "Buy", "Filled", 10),
        ]);

        // The malformed report produced no outcome; the rest applied in order.
        assert_eq!(outcomes, vec![Outcome::OnBoard, Outcome::Completed]);
        assert_eq!(ledger.positions().sum(), (1, 10));
    }

    #[test]
    fn apply_fill_matches_report_path() {
        let ledger = Ledger::new();
        let id = OrderId::from("a");
        ledger.apply_report(&report("a", "Buy", "New", 10)).unwrap();

        assert_eq!(ledger.apply_fill(&id, false, Side::Buy, 4), Outcome::Partial);
        assert_eq!(ledger.orders().get(&id).unwrap().signed_qty, 6);

        assert_eq!(
            ledger.apply_fill(&id, false, Side::Buy, 6),
            Outcome::Completed
        );
        assert_eq!(ledger.positions().get(&id).unwrap().signed_qty, 10);
    }

    #[test]
    fn apply_fill_cancel_flag_short_circuits() {
        let ledger = Ledger::new();
        let id = OrderId::from("a");
        ledger.apply_report(&report("a", "Buy", "New", 10)).unwrap();

        assert_eq!(ledger.apply_fill(&id, true, Side::Buy, 0), Outcome::Canceled);
        assert!(ledger.orders().is_empty());
        assert!(ledger.cancels().contains(&id));
    }

    #[test]
    fn apply_fill_untracked_is_not_exist() {
        let ledger = Ledger::new();
        assert_eq!(
            ledger.apply_fill(&OrderId::from("ghost"), false, Side::Sell, 3),
            Outcome::NotExist
        );
    }

    #[test]
    fn overfill_completes_with_report_quantity() {
        let ledger = Ledger::new();
        let id = OrderId::from("a");
        ledger.apply_report(&report("a", "Buy", "New", 10)).unwrap();

        // A fill at least as large as the remainder is terminal.
        let outcome = ledger
            .apply_report(&report("a", "Buy", "Filled", 12))
            .unwrap();
        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(ledger.positions().get(&id).unwrap().signed_qty, 12);
    }
}
