//! depot-stock: the pure reservation core.
//!
//! Everything in this crate is deterministic and IO-free: the in-memory
//! stock book (working copy), the transition-plan arithmetic, the FIFO
//! admission sweep planner, and the strict withdrawal guard. Two calls with
//! the same inputs always produce the same outputs.
//!
//! The engine crate (depot-engine) owns the stores and applies the plans
//! this crate computes; this crate never touches a ledger.

mod book;
mod guard;
mod plan;
mod sweep;

pub use book::StockBook;
pub use guard::check_withdrawal;
pub use plan::{plan_removal, plan_transition, Adjustment, TransitionPlan};
pub use sweep::{plan_sweep, SweepPlan};

use depot_schemas::ResourceKey;

// ---------------------------------------------------------------------------
// StockError
// ---------------------------------------------------------------------------

/// Invariant violations the pure core can surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockError {
    /// A quantity that must be strictly positive was zero or negative.
    InvalidQuantity { qty: i64 },
    /// A withdrawal (or production consumption) exceeds on-hand stock.
    InsufficientStock {
        resource: ResourceKey,
        requested: i64,
        available: i64,
    },
}

impl std::fmt::Display for StockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidQuantity { qty } => {
                write!(f, "quantity must be > 0, got {qty}")
            }
            Self::InsufficientStock {
                resource,
                requested,
                available,
            } => write!(
                f,
                "insufficient stock for {resource}: requested {requested}, available {available}"
            ),
        }
    }
}

impl std::error::Error for StockError {}
