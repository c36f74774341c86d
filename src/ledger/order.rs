//! Order record value type and identity.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ReportError;
use crate::exchange::{ExecutionReport, OrderStatus, Side};

/// Exchange-assigned order identity.
///
/// Always a single explicit string value; other representations are rejected
/// or normalized at the boundary when reports are mapped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Create an order identity.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// View as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One tracked order, as held in the ledger's collections.
///
/// Invariant: `signed_qty`'s sign always equals the sign implied by `side`
/// (buy non-negative, sell non-positive). A violation indicates a
/// reconciliation bug, never a valid exchange state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    /// Exchange-assigned order identifier.
    pub order_id: OrderId,
    /// Outstanding (or, in positions, accumulated filled) contract count,
    /// positive for buys and negative for sells.
    pub signed_qty: i64,
    /// Side the order was placed on.
    pub side: Side,
    /// Last-seen report status; lets a later transition tell whether the
    /// order was previously partially filled.
    pub status: OrderStatus,
}

impl OrderRecord {
    /// Build a record with the quantity normalized to the side's sign.
    pub fn new(order_id: OrderId, side: Side, qty: i64, status: OrderStatus) -> Self {
        Self {
            order_id,
            signed_qty: qty.abs() * side.sign(),
            side,
            status,
        }
    }

    /// Map an execution report into a record.
    ///
    /// This is the only place wire fields become ledger state; identity,
    /// side, status, and quantity are all required here.
    pub fn from_report(report: &ExecutionReport) -> Result<Self, ReportError> {
        let order_id = report
            .order_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(ReportError::MalformedReport { field: "orderID" })?;

        let side_str = report
            .side
            .as_deref()
            .ok_or(ReportError::MalformedReport { field: "side" })?;
        let side = Side::from_report(side_str).ok_or_else(|| ReportError::UnrecognizedSide {
            order_id: order_id.to_string(),
            side: side_str.to_string(),
        })?;

        let status = report.status().ok_or(ReportError::MalformedReport {
            field: "ordStatus",
        })?;

        let qty = report
            .order_qty
            .ok_or(ReportError::MalformedReport { field: "orderQty" })?;

        Ok(Self::new(OrderId::from(order_id), side, qty, status))
    }

    /// Empty placeholder marking a canceled identity; quantity is zero and
    /// the side carries no meaning.
    pub fn tombstone(order_id: OrderId) -> Self {
        Self {
            order_id,
            signed_qty: 0,
            side: Side::Buy,
            status: OrderStatus::Canceled,
        }
    }

    /// Whether the stored quantity's sign matches the side's sign.
    pub fn sign_matches_side(&self) -> bool {
        self.signed_qty * self.side.sign() >= 0
    }
}
