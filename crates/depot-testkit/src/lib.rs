//! Shared fixtures for depot scenario tests.
//!
//! Everything here runs over the deterministic in-memory store so the engine
//! scenarios need no database. Builders keep the scenario files focused on
//! the behavior under test, not ledger plumbing.

use std::sync::Arc;

use depot_engine::{DepotEngine, StockStore};
use depot_schemas::{AmmoKind, RequiredSet, ResourceKey, StockRow};
use depot_store_mem::MemStore;

/// Shorthand for building a requirement map in tests.
pub fn required(pairs: &[(AmmoKind, i64)]) -> RequiredSet {
    RequiredSet::from_pairs(pairs)
}

/// A fresh in-memory store seeded with the given ammo and material rows.
/// Prices are zeroed; scenarios that care about pricing seed explicitly.
pub async fn seeded_store(ammo: &[(AmmoKind, i64)], materials: &[(&str, i64)]) -> Arc<MemStore> {
    let store = Arc::new(MemStore::new());
    let mut rows = Vec::new();
    for (kind, qty) in ammo {
        rows.push(StockRow::new(ResourceKey::ammo(*kind), *qty, 0));
    }
    for (name, qty) in materials {
        rows.push(StockRow::new(ResourceKey::material(*name), *qty, 0));
    }
    store.seed(rows).await;
    store
}

/// Engine wired to one shared in-memory store for both ledgers.
pub fn engine_over(store: Arc<MemStore>) -> DepotEngine {
    DepotEngine::new(store.clone(), store)
}

/// One-call fixture: seeded store plus an engine over it.
pub async fn depot_with_stock(
    ammo: &[(AmmoKind, i64)],
    materials: &[(&str, i64)],
) -> (DepotEngine, Arc<MemStore>) {
    let store = seeded_store(ammo, materials).await;
    (engine_over(store.clone()), store)
}

/// Consolidated on-hand quantity for one ammo kind (0 if never seeded).
pub async fn ammo_on_hand(store: &MemStore, kind: AmmoKind) -> i64 {
    store
        .quantity(&ResourceKey::ammo(kind))
        .await
        .ok()
        .flatten()
        .unwrap_or(0)
}
