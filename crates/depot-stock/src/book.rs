//! In-memory working copy of on-hand stock.
//!
//! The admission sweep decides against a [`StockBook`], never against the
//! persisted ledger directly: the book is built once per sweep from the
//! ledger rows (duplicate rows consolidated by summation) and decremented
//! as orders are promoted, so later orders in the same sweep see the stock
//! already claimed by earlier ones.

use std::collections::BTreeMap;

use depot_schemas::{AmmoKind, RequiredSet, ResourceKey, StockRow};

/// Consolidated on-hand quantities keyed by resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockBook {
    quantities: BTreeMap<ResourceKey, i64>,
}

impl StockBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a book from ledger rows, summing duplicate `(category, name)`
    /// rows into one entry.
    pub fn from_rows<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = &'a StockRow>,
    {
        let mut quantities: BTreeMap<ResourceKey, i64> = BTreeMap::new();
        for row in rows {
            *quantities.entry(row.key.clone()).or_insert(0) += row.quantity;
        }
        Self { quantities }
    }

    /// On-hand quantity for a resource (0 if the book has no entry).
    pub fn available(&self, key: &ResourceKey) -> i64 {
        self.quantities.get(key).copied().unwrap_or(0)
    }

    /// On-hand quantity for a finished ammo kind.
    pub fn available_ammo(&self, kind: AmmoKind) -> i64 {
        self.available(&ResourceKey::ammo(kind))
    }

    /// Whether every non-zero requirement in `required` is satisfiable.
    pub fn can_satisfy(&self, required: &RequiredSet) -> bool {
        required
            .iter()
            .all(|(kind, qty)| self.available_ammo(kind) >= qty)
    }

    /// Reserve `required` against the working copy.
    ///
    /// All-or-nothing: either every kind is decremented, or (on any
    /// shortage) the book is left untouched and `false` is returned.
    pub fn reserve(&mut self, required: &RequiredSet) -> bool {
        if !self.can_satisfy(required) {
            return false;
        }
        for (kind, qty) in required.iter() {
            *self
                .quantities
                .entry(ResourceKey::ammo(kind))
                .or_insert(0) -= qty;
        }
        true
    }

    /// Number of distinct resources tracked.
    pub fn len(&self) -> usize {
        self.quantities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quantities.is_empty()
    }
}
