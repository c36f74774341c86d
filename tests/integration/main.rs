//! Integration tests for the order ledger.
//!
//! These drive full report sequences through the public API, the way the
//! connectivity layer does in production: parse a wire batch, apply it,
//! inspect the three collections.

use std::sync::Arc;

use order_ledger::exchange::{ExecutionReport, OrderStatus, Side};
use order_ledger::ledger::{Ledger, OrderId, Outcome};

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
fn wire_batch_reconciles_end_to_end() {
    // A realistic delivery: one order created, partially filled, completed;
    // another created and canceled; a fill for an unknown order.
    let raw = r#"[
        {"orderID": "0193e879-aaaa", "symbol": "XBTUSD", "side": "Buy",
         "ordStatus": "New", "orderQty": 10},
        {"orderID": "0193e879-bbbb", "symbol": "XBTUSD", "side": "Sell",
         "ordStatus": "New", "orderQty": 4},
        {"orderID": "0193e879-aaaa", "symbol": "XBTUSD", "side": "Buy",
         "ordStatus": "Partially", "orderQty": 4},
        {"orderID": "0193e879-aaaa", "symbol": "XBTUSD", "side": "Buy",
         "ordStatus": "Partially", "orderQty": 6},
        {"orderID": "0193e879-bbbb", "symbol": "XBTUSD", "side": "Sell",
         "ordStatus": "Canceled", "orderQty": 0},
        {"orderID": "0193e879-ffff", "symbol": "XBTUSD", "side": "Buy",
         "ordStatus": "Filled", "orderQty": 1}
    ]"#;

    let reports: Vec<ExecutionReport> = serde_json::from_str(raw).unwrap();
    let ledger = Ledger::new();
    let outcomes = ledger.apply_reports(&reports);

    assert_eq!(
        outcomes,
        vec![
            Outcome::OnBoard,
            Outcome::OnBoard,
            Outcome::Partial,
            Outcome::Completed,
            Outcome::Canceled,
            Outcome::NotExist,
        ]
    );

    // Buy order fully accumulated into positions.
    let pos = ledger
        .positions()
        .get(&OrderId::from("0193e879-aaaa"))
        .unwrap();
    assert_eq!(pos.signed_qty, 10);
    assert_eq!(pos.status, OrderStatus::Filled);

    // Sell order tombstoned.
    assert!(ledger.orders().is_empty());
    assert!(ledger.cancels().contains(&OrderId::from("0193e879-bbbb")));

    // Unknown fill left no trace.
    assert!(!ledger.positions().contains(&OrderId::from("0193e879-ffff")));
}

#[test]
fn net_exposure_sums_across_identities() {
    let ledger = Ledger::new();
    ledger.apply_reports(&[
        report("a", "Buy", "New", 10),
        report("b", "Sell", "New", 3),
        report("c", "Buy", "New", 2),
    ]);

    assert_eq!(ledger.orders().sum(), (3, 9));

    ledger.apply_reports(&[
        report("a", "Buy", "Filled", 10),
        report("b", "Sell", "Filled", 3),
    ]);

    assert_eq!(ledger.orders().sum(), (1, 2));
    assert_eq!(ledger.positions().sum(), (2, 7));
}

#[test]
fn partial_then_cancel_keeps_accumulated_position() {
    let ledger = Ledger::new();
    let id = OrderId::from("a");

    ledger.apply_reports(&[
        report("a", "Buy", "New", 10),
        report("a", "Buy", "Partially", 4),
        report("a", "Buy", "Canceled", 0),
    ]);

    // The unfilled remainder is gone, the filled part stays booked.
    assert!(!ledger.orders().contains(&id));
    assert!(ledger.cancels().contains(&id));
    assert_eq!(ledger.positions().get(&id).unwrap().signed_qty, 4);
}

#[test]
fn reused_identity_after_eviction_is_untracked() {
    let ledger = Ledger::new();
    for i in 0..10 {
        ledger
            .apply_report(&report(&format!("ord-{:02}", i), "Buy", "New", 1))
            .unwrap();
    }

    assert_eq!(ledger.orders().evict_oldest(50), 5);
    assert_eq!(ledger.orders().len(), 5);

    // A fill for an evicted identity no longer matches.
    let outcome = ledger
        .apply_report(&report("ord-00", "Buy", "Filled", 1))
        .unwrap();
    assert_eq!(outcome, Outcome::NotExist);

    // A surviving identity still matches.
    let outcome = ledger
        .apply_report(&report("ord-07", "Buy", "Filled", 1))
        .unwrap();
    assert_eq!(outcome, Outcome::Completed);
}

#[test]
fn out_of_band_fills_interleave_with_reports() {
    let ledger = Ledger::new();
    let id = OrderId::from("a");

    ledger.apply_report(&report("a", "Sell", "New", 12)).unwrap();

    // The caller learned of a fill without a full report.
    assert_eq!(ledger.apply_fill(&id, false, Side::Sell, 5), Outcome::Partial);
    assert_eq!(ledger.orders().get(&id).unwrap().signed_qty, -7);

    // A later stream report finishes the order.
    let outcome = ledger
        .apply_report(&report("a", "Sell", "Filled", 7))
        .unwrap();
    assert_eq!(outcome, Outcome::Completed);
    assert_eq!(ledger.positions().get(&id).unwrap().signed_qty, -12);
}

#[test]
fn concurrent_readers_observe_live_batches() {
    let ledger = Arc::new(Ledger::new());
    for i in 0..100 {
        ledger
            .apply_report(&report(&format!("ord-{:03}", i), "Buy", "New", 1))
            .unwrap();
    }

    let writer = {
        let ledger = ledger.clone();
        std::thread::spawn(move || {
            for i in 0..100 {
                ledger
                    .apply_report(&report(&format!("ord-{:03}", i), "Buy", "Filled", 1))
                    .unwrap();
            }
        })
    };

    // Display-style reader: per-collection reads stay coherent while the
    // writer migrates records; totals across collections may transiently
    // disagree, which is the documented relaxed guarantee.
    for _ in 0..50 {
        let (orders_count, orders_net) = ledger.orders().sum();
        assert_eq!(orders_count as i64, orders_net);

        let (positions_count, positions_net) = ledger.positions().sum();
        assert_eq!(positions_count as i64, positions_net);
    }

    writer.join().unwrap();
    assert_eq!(ledger.orders().sum(), (0, 0));
    assert_eq!(ledger.positions().sum(), (100, 100));
}

#[test]
fn malformed_reports_never_poison_a_batch() {
    let ledger = Ledger::new();

    let missing_id = ExecutionReport {
        order_id: None,
        symbol: None,
        side: Some("Buy".to_string()),
        ord_status: Some("New".to_string()),
        order_qty: Some(5),
        price: None,
        timestamp: None,
    };
    let unknown_status = report("x", "Buy", "Working", 5);
    let bad_side = report("y", "Short", "New", 5);

    let outcomes = ledger.apply_reports(&[
        missing_id,
        report("a", "Buy", "New", 10),
        unknown_status,
        bad_side,
        report("a", "Buy", "Filled", 10),
    ]);

    assert_eq!(outcomes, vec![Outcome::OnBoard, Outcome::Completed]);
    assert_eq!(ledger.positions().sum(), (1, 10));
}
