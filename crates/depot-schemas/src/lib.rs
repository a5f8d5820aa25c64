//! Shared wire/storage types for the depot workspace.
//!
//! Every layer (pure core, engine, stores, CLI, daemon) speaks these types.
//! Keep this crate dependency-light: serde + chrono + uuid only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Fixed-point scale for prices: 1_000_000 micros = 1 currency unit.
pub const MICROS_SCALE: i64 = 1_000_000;

// ---------------------------------------------------------------------------
// ResourceCategory
// ---------------------------------------------------------------------------

/// The two kinds of stock the depot tracks: raw materials and finished ammo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceCategory {
    Material,
    Ammo,
}

impl ResourceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceCategory::Material => "material",
            ResourceCategory::Ammo => "ammo",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "material" => Some(ResourceCategory::Material),
            "ammo" => Some(ResourceCategory::Ammo),
            _ => None,
        }
    }
}

impl std::fmt::Display for ResourceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// AmmoKind
// ---------------------------------------------------------------------------

/// The four finished-goods kinds an order may require.
///
/// The set is closed: orders are maps over exactly these kinds, and the
/// admission scan reads exactly these four stock rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AmmoKind {
    #[serde(rename = "9mm")]
    Mm9,
    #[serde(rename = "5.56mm")]
    Mm556,
    #[serde(rename = "7.62mm")]
    Mm762,
    #[serde(rename = "12.7mm")]
    Mm127,
}

impl AmmoKind {
    /// All kinds in canonical (sort) order.
    pub const ALL: [AmmoKind; 4] = [
        AmmoKind::Mm9,
        AmmoKind::Mm556,
        AmmoKind::Mm762,
        AmmoKind::Mm127,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AmmoKind::Mm9 => "9mm",
            AmmoKind::Mm556 => "5.56mm",
            AmmoKind::Mm762 => "7.62mm",
            AmmoKind::Mm127 => "12.7mm",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "9mm" => Some(AmmoKind::Mm9),
            "5.56mm" => Some(AmmoKind::Mm556),
            "7.62mm" => Some(AmmoKind::Mm762),
            "12.7mm" => Some(AmmoKind::Mm127),
            _ => None,
        }
    }
}

impl std::fmt::Display for AmmoKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ResourceKey
// ---------------------------------------------------------------------------

/// Identity of one stock row: `(category, name)`.
///
/// For ammo rows the name is the ammo kind string (e.g. `"9mm"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    pub category: ResourceCategory,
    pub name: String,
}

impl ResourceKey {
    pub fn material(name: impl Into<String>) -> Self {
        Self {
            category: ResourceCategory::Material,
            name: name.into(),
        }
    }

    pub fn ammo(kind: AmmoKind) -> Self {
        Self {
            category: ResourceCategory::Ammo,
            name: kind.as_str().to_string(),
        }
    }

    /// The ammo kind this key refers to, if it is a well-formed ammo key.
    pub fn ammo_kind(&self) -> Option<AmmoKind> {
        if self.category == ResourceCategory::Ammo {
            AmmoKind::parse(&self.name)
        } else {
            None
        }
    }
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.category.as_str(), self.name)
    }
}

// ---------------------------------------------------------------------------
// StockRow
// ---------------------------------------------------------------------------

/// One persisted stock ledger row.
///
/// Invariant: `quantity` must never be persisted negative. Stores enforce
/// this at the write boundary; the engine treats a rejected write as a
/// logged degradation (see depot-engine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRow {
    #[serde(flatten)]
    pub key: ResourceKey,
    pub quantity: i64,
    pub unit_price_micros: i64,
}

impl StockRow {
    pub fn new(key: ResourceKey, quantity: i64, unit_price_micros: i64) -> Self {
        Self {
            key,
            quantity,
            unit_price_micros,
        }
    }
}

// ---------------------------------------------------------------------------
// RequiredSet
// ---------------------------------------------------------------------------

/// Per-kind quantities an order requires. Zero entries are normalized away,
/// so two sets requiring the same effective quantities compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequiredSet(BTreeMap<AmmoKind, i64>);

impl RequiredSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: &[(AmmoKind, i64)]) -> Self {
        let mut s = Self::new();
        for (kind, qty) in pairs {
            s.set(*kind, *qty);
        }
        s
    }

    /// Quantity required for a kind (0 if absent).
    pub fn get(&self, kind: AmmoKind) -> i64 {
        self.0.get(&kind).copied().unwrap_or(0)
    }

    /// Set the requirement for one kind. Zero removes the entry.
    pub fn set(&mut self, kind: AmmoKind, qty: i64) {
        if qty == 0 {
            self.0.remove(&kind);
        } else {
            self.0.insert(kind, qty);
        }
    }

    /// Non-zero entries in canonical kind order.
    pub fn iter(&self) -> impl Iterator<Item = (AmmoKind, i64)> + '_ {
        self.0.iter().map(|(k, q)| (*k, *q))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when any entry is negative (invalid as an order requirement).
    pub fn has_negative(&self) -> bool {
        self.0.values().any(|q| *q < 0)
    }

    /// Per-kind delta `self − prev` over the union of kinds, zeros skipped.
    ///
    /// Positive delta = this set needs more than `prev`; negative = less.
    pub fn delta(&self, prev: &RequiredSet) -> Vec<(AmmoKind, i64)> {
        let mut out = Vec::new();
        for kind in AmmoKind::ALL {
            let d = self.get(kind) - prev.get(kind);
            if d != 0 {
                out.push((kind, d));
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// OrderStatus
// ---------------------------------------------------------------------------

/// The four-state order lifecycle.
///
/// Transitions are classified by *reservation state*, not literal status:
/// `Ready` and `Delivered` hold a stock reservation, `Pending` and
/// `Cancelled` do not. See [`OrderStatus::is_reserved`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Ready,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Whether this status implies the order's `required` quantities are
    /// currently debited from the stock ledger.
    pub fn is_reserved(&self) -> bool {
        matches!(self, OrderStatus::Ready | OrderStatus::Delivered)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Ready => "ready",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "ready" => Some(OrderStatus::Ready),
            "delivered" => Some(OrderStatus::Delivered),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// OrderRecord
// ---------------------------------------------------------------------------

/// One customer order as read from the order ledger.
///
/// `seq` is assigned by the store at insert and is strictly increasing; the
/// FIFO admission scan orders by `(created_at, seq)` so `created_at` ties
/// resolve to insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: Uuid,
    pub seq: u64,
    pub required: RequiredSet,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_set_normalizes_zero_entries() {
        let mut r = RequiredSet::new();
        r.set(AmmoKind::Mm9, 5);
        r.set(AmmoKind::Mm9, 0);
        assert!(r.is_empty());
        assert_eq!(r, RequiredSet::new());
    }

    #[test]
    fn required_set_delta_spans_union_of_kinds() {
        let old = RequiredSet::from_pairs(&[(AmmoKind::Mm9, 10), (AmmoKind::Mm556, 3)]);
        let new = RequiredSet::from_pairs(&[(AmmoKind::Mm9, 15), (AmmoKind::Mm762, 2)]);
        let d = new.delta(&old);
        assert_eq!(
            d,
            vec![
                (AmmoKind::Mm9, 5),
                (AmmoKind::Mm556, -3),
                (AmmoKind::Mm762, 2)
            ]
        );
    }

    #[test]
    fn delta_of_identical_sets_is_empty() {
        let r = RequiredSet::from_pairs(&[(AmmoKind::Mm127, 7)]);
        assert!(r.delta(&r.clone()).is_empty());
    }

    #[test]
    fn reservation_predicate_matches_lifecycle() {
        assert!(!OrderStatus::Pending.is_reserved());
        assert!(OrderStatus::Ready.is_reserved());
        assert!(OrderStatus::Delivered.is_reserved());
        assert!(!OrderStatus::Cancelled.is_reserved());
    }

    #[test]
    fn ammo_kind_round_trips_through_strings() {
        for kind in AmmoKind::ALL {
            assert_eq!(AmmoKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(AmmoKind::parse("40mm"), None);
    }

    #[test]
    fn required_set_serializes_with_kind_names_as_keys() {
        let r = RequiredSet::from_pairs(&[(AmmoKind::Mm9, 50)]);
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, r#"{"9mm":50}"#);
        let back: RequiredSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn status_strings_round_trip() {
        for s in ["pending", "ready", "delivered", "cancelled"] {
            assert_eq!(OrderStatus::parse(s).unwrap().as_str(), s);
        }
    }
}
