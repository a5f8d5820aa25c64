//! Storage seams: the two ledgers the engine mutates.
//!
//! Implementations: `depot-store-mem` (deterministic in-memory, used by
//! tests and single-process deployments) and `depot-db` (PostgreSQL).
//!
//! Both stores enforce the persistence invariant at the write boundary:
//! a delta that would drive a quantity negative is rejected with
//! [`StoreError::WouldGoNegative`] and nothing is written.

use async_trait::async_trait;
use depot_schemas::{OrderRecord, OrderStatus, RequiredSet, ResourceKey, StockRow};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

/// Failures surfaced by store implementations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The addressed row does not exist.
    NotFound { what: String },
    /// Applying the delta would persist a negative quantity.
    WouldGoNegative {
        resource: ResourceKey,
        delta_units: i64,
        available: i64,
    },
    /// Any underlying persistence failure (connection, constraint, codec).
    Backend { message: String },
}

impl StoreError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { what } => write!(f, "not found: {what}"),
            Self::WouldGoNegative {
                resource,
                delta_units,
                available,
            } => write!(
                f,
                "delta {delta_units} on {resource} would go negative (available {available})"
            ),
            Self::Backend { message } => write!(f, "store backend error: {message}"),
        }
    }
}

impl std::error::Error for StoreError {}

// ---------------------------------------------------------------------------
// StockStore
// ---------------------------------------------------------------------------

/// The persistent key→quantity stock ledger.
#[async_trait]
pub trait StockStore: Send + Sync {
    /// All ledger rows. May contain duplicate `(category, name)` rows;
    /// consumers consolidate by summation.
    async fn rows(&self) -> Result<Vec<StockRow>, StoreError>;

    /// Consolidated on-hand quantity for one resource, `None` if the
    /// resource has never been seeded.
    async fn quantity(&self, key: &ResourceKey) -> Result<Option<i64>, StoreError>;

    /// Apply one signed delta (positive = credit, negative = debit) as an
    /// atomic read-modify-write. Rejects writes that would go negative.
    async fn apply_delta(&self, key: &ResourceKey, delta_units: i64) -> Result<(), StoreError>;

    /// Insert or replace a row by `(category, name)`. Seeding only.
    async fn upsert_row(&self, row: StockRow) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// OrderStore
// ---------------------------------------------------------------------------

/// The persistent order ledger.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert a new order in `pending`; the store assigns id, seq and
    /// created_at.
    async fn insert(&self, required: RequiredSet) -> Result<OrderRecord, StoreError>;

    async fn fetch(&self, id: Uuid) -> Result<Option<OrderRecord>, StoreError>;

    async fn list(&self) -> Result<Vec<OrderRecord>, StoreError>;

    /// Pending orders in FIFO order: `created_at` ascending, ties broken by
    /// insertion `seq` ascending.
    async fn pending_fifo(&self) -> Result<Vec<OrderRecord>, StoreError>;

    /// Write the new `(status, required)` pair for an order.
    async fn write_state(
        &self,
        id: Uuid,
        status: OrderStatus,
        required: &RequiredSet,
    ) -> Result<(), StoreError>;

    /// Erase the order row.
    async fn remove(&self, id: Uuid) -> Result<(), StoreError>;
}
