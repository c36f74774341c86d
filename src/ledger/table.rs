//! Thread-safe order collection keyed by order identity.

use dashmap::DashMap;

use super::order::{OrderId, OrderRecord};

/// A concurrent `OrderId -> OrderRecord` map.
///
/// Individual operations are atomic; iteration-based operations (`sum`,
/// `evict_oldest`, `snapshot`) observe a weakly consistent view when writers
/// are active, which is acceptable for the display/monitoring consumers they
/// serve. The underlying map is never exposed.
#[derive(Debug, Default)]
pub struct OrderTable {
    inner: DashMap<OrderId, OrderRecord>,
}

impl OrderTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    /// Insert or overwrite the record under its own identity.
    pub fn insert(&self, record: OrderRecord) {
        self.inner.insert(record.order_id.clone(), record);
    }

    /// Remove an identity; no-op if absent.
    pub fn remove(&self, order_id: &OrderId) {
        self.inner.remove(order_id);
    }

    /// Look up a record. `None` is a normal outcome, e.g. a report for an
    /// order whose creation this client never observed.
    pub fn get(&self, order_id: &OrderId) -> Option<OrderRecord> {
        self.inner.get(order_id).map(|r| r.clone())
    }

    /// Whether the identity is currently tracked.
    pub fn contains(&self, order_id: &OrderId) -> bool {
        self.inner.contains_key(order_id)
    }

    /// Number of tracked identities.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Full scan: count and arithmetic sum of signed quantities.
    ///
    /// The sum is a coarse net-exposure estimate across all tracked
    /// identities, not instrument-aware.
    pub fn sum(&self) -> (usize, i64) {
        let mut length = 0usize;
        let mut sum = 0i64;
        for entry in self.inner.iter() {
            length += 1;
            sum += entry.value().signed_qty;
        }
        (length, sum)
    }

    /// Delete the leading `percent`% of identities in ascending
    /// lexicographic key order, returning how many were removed.
    ///
    /// Assumes identities sort lexicographically in creation order, which
    /// holds only for time-prefixed identity formats. Confirm the venue's
    /// identity format before relying on this for true age-based eviction.
    pub fn evict_oldest(&self, percent: u32) -> usize {
        let mut keys: Vec<OrderId> = self.inner.iter().map(|e| e.key().clone()).collect();
        keys.sort();

        let stop = keys.len() * percent.min(100) as usize / 100;
        for key in keys.iter().take(stop) {
            self.inner.remove(key);
        }
        stop
    }

    /// Clone out all records, for display readers.
    pub fn snapshot(&self) -> Vec<OrderRecord> {
        self.inner.iter().map(|e| e.value().clone()).collect()
    }
}
