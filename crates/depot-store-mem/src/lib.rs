//! Deterministic in-memory implementation of the depot store traits.
//!
//! Design decisions (kept intentionally simple/deterministic):
//! - BTreeMap-backed order ledger; a monotonic `seq` counter assigned at
//!   insert is the FIFO tie breaker.
//! - The stock ledger is a `Vec<StockRow>` so duplicate `(category, name)`
//!   rows can exist; consolidation-by-summation is a real code path here,
//!   exactly as with a messy persistent ledger.
//! - `apply_delta` is an atomic read-modify-write under one `RwLock` write
//!   guard and rejects writes that would persist a negative total.
//! - No randomness beyond `Uuid::new_v4` for ids; timestamps only at insert.
//!
//! Used by the engine's scenario tests and usable as a single-process
//! backend.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use depot_engine::{OrderStore, StockStore, StoreError};
use depot_schemas::{OrderRecord, OrderStatus, RequiredSet, ResourceKey, StockRow};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Inner {
    stock: Vec<StockRow>,
    orders: BTreeMap<Uuid, OrderRecord>,
    next_seq: u64,
}

/// In-memory stock + order ledgers behind one lock.
#[derive(Debug, Default)]
pub struct MemStore {
    inner: RwLock<Inner>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw ledger row without consolidating. Fixtures use this to
    /// create duplicate rows; production seeding goes through `upsert_row`.
    pub async fn insert_row(&self, row: StockRow) {
        self.inner.write().await.stock.push(row);
    }

    /// Seed several rows at once (upsert semantics).
    pub async fn seed(&self, rows: Vec<StockRow>) {
        let mut inner = self.inner.write().await;
        for row in rows {
            inner.stock.retain(|r| r.key != row.key);
            inner.stock.push(row);
        }
    }
}

fn consolidated(stock: &[StockRow], key: &ResourceKey) -> Option<i64> {
    let mut found = false;
    let mut total = 0i64;
    for row in stock {
        if &row.key == key {
            found = true;
            total += row.quantity;
        }
    }
    found.then_some(total)
}

#[async_trait]
impl StockStore for MemStore {
    async fn rows(&self) -> Result<Vec<StockRow>, StoreError> {
        Ok(self.inner.read().await.stock.clone())
    }

    async fn quantity(&self, key: &ResourceKey) -> Result<Option<i64>, StoreError> {
        Ok(consolidated(&self.inner.read().await.stock, key))
    }

    async fn apply_delta(&self, key: &ResourceKey, delta_units: i64) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;

        let Some(total) = consolidated(&inner.stock, key) else {
            return Err(StoreError::not_found(format!("stock row {key}")));
        };
        if total + delta_units < 0 {
            return Err(StoreError::WouldGoNegative {
                resource: key.clone(),
                delta_units,
                available: total,
            });
        }

        if delta_units >= 0 {
            // Credit the first matching row.
            if let Some(row) = inner.stock.iter_mut().find(|r| &r.key == key) {
                row.quantity += delta_units;
            }
        } else {
            // Debit across duplicate rows in ledger order.
            let mut remaining = -delta_units;
            for row in inner.stock.iter_mut().filter(|r| &r.key == key) {
                let take = remaining.min(row.quantity);
                row.quantity -= take;
                remaining -= take;
                if remaining == 0 {
                    break;
                }
            }
        }
        Ok(())
    }

    async fn upsert_row(&self, row: StockRow) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.stock.retain(|r| r.key != row.key);
        inner.stock.push(row);
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemStore {
    async fn insert(&self, required: RequiredSet) -> Result<OrderRecord, StoreError> {
        let mut inner = self.inner.write().await;
        inner.next_seq += 1;
        let record = OrderRecord {
            id: Uuid::new_v4(),
            seq: inner.next_seq,
            required,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        };
        inner.orders.insert(record.id, record.clone());
        Ok(record)
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<OrderRecord>, StoreError> {
        Ok(self.inner.read().await.orders.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<OrderRecord>, StoreError> {
        let inner = self.inner.read().await;
        let mut all: Vec<OrderRecord> = inner.orders.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.seq.cmp(&b.seq)));
        Ok(all)
    }

    async fn pending_fifo(&self) -> Result<Vec<OrderRecord>, StoreError> {
        let inner = self.inner.read().await;
        let mut pending: Vec<OrderRecord> = inner
            .orders
            .values()
            .filter(|o| o.status == OrderStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.seq.cmp(&b.seq)));
        Ok(pending)
    }

    async fn write_state(
        &self,
        id: Uuid,
        status: OrderStatus,
        required: &RequiredSet,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let Some(order) = inner.orders.get_mut(&id) else {
            return Err(StoreError::not_found(format!("order {id}")));
        };
        order.status = status;
        order.required = required.clone();
        Ok(())
    }

    async fn remove(&self, id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.orders.remove(&id).is_none() {
            return Err(StoreError::not_found(format!("order {id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_schemas::AmmoKind;

    fn ammo_row(kind: AmmoKind, qty: i64) -> StockRow {
        StockRow::new(ResourceKey::ammo(kind), qty, 0)
    }

    #[tokio::test]
    async fn quantity_consolidates_duplicate_rows() {
        let store = MemStore::new();
        store.insert_row(ammo_row(AmmoKind::Mm9, 30)).await;
        store.insert_row(ammo_row(AmmoKind::Mm9, 20)).await;

        let key = ResourceKey::ammo(AmmoKind::Mm9);
        assert_eq!(store.quantity(&key).await.unwrap(), Some(50));
        assert_eq!(
            store.quantity(&ResourceKey::ammo(AmmoKind::Mm556)).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn debit_spreads_across_duplicate_rows() {
        let store = MemStore::new();
        store.insert_row(ammo_row(AmmoKind::Mm9, 10)).await;
        store.insert_row(ammo_row(AmmoKind::Mm9, 10)).await;

        let key = ResourceKey::ammo(AmmoKind::Mm9);
        store.apply_delta(&key, -15).await.unwrap();
        assert_eq!(store.quantity(&key).await.unwrap(), Some(5));

        let rows = StockStore::rows(&store).await.unwrap();
        assert_eq!(rows[0].quantity, 0);
        assert_eq!(rows[1].quantity, 5);
    }

    #[tokio::test]
    async fn negative_total_is_rejected_and_nothing_moves() {
        let store = MemStore::new();
        store.insert_row(ammo_row(AmmoKind::Mm9, 3)).await;

        let key = ResourceKey::ammo(AmmoKind::Mm9);
        let err = store.apply_delta(&key, -4).await.unwrap_err();
        assert!(matches!(err, StoreError::WouldGoNegative { available: 3, .. }));
        assert_eq!(store.quantity(&key).await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn delta_on_unknown_resource_is_not_found() {
        let store = MemStore::new();
        let key = ResourceKey::material("Cordite");
        assert!(matches!(
            store.apply_delta(&key, 5).await.unwrap_err(),
            StoreError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn upsert_replaces_all_duplicates_with_one_row() {
        let store = MemStore::new();
        store.insert_row(ammo_row(AmmoKind::Mm9, 10)).await;
        store.insert_row(ammo_row(AmmoKind::Mm9, 10)).await;
        store.upsert_row(ammo_row(AmmoKind::Mm9, 7)).await.unwrap();

        let rows = StockStore::rows(&store).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].quantity, 7);
    }

    #[tokio::test]
    async fn insert_assigns_monotonic_seq_and_pending_status() {
        let store = MemStore::new();
        let a = store.insert(RequiredSet::new()).await.unwrap();
        let b = store.insert(RequiredSet::new()).await.unwrap();
        assert!(b.seq > a.seq);
        assert_eq!(a.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn pending_fifo_filters_and_sorts() {
        let store = MemStore::new();
        let a = store.insert(RequiredSet::new()).await.unwrap();
        let b = store.insert(RequiredSet::new()).await.unwrap();
        store
            .write_state(a.id, OrderStatus::Ready, &a.required)
            .await
            .unwrap();

        let pending = store.pending_fifo().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, b.id);
    }

    #[tokio::test]
    async fn remove_missing_order_errors() {
        let store = MemStore::new();
        assert!(matches!(
            store.remove(Uuid::new_v4()).await.unwrap_err(),
            StoreError::NotFound { .. }
        ));
    }
}
