//! Admission sweep planning: the FIFO readiness scan.
//!
//! Given a stock book and the pending queue, decide which orders to promote
//! to `ready`. Strict FIFO fairness over throughput: the scan walks the
//! queue oldest-first and **halts at the first order it cannot satisfy**,
//! even when a younger order would fit in the remaining stock.
//!
//! The planner is pure: it consumes the book (the per-sweep working copy)
//! and returns the promotion decision; the engine applies the resulting
//! debits and status writes against the stores.

use depot_schemas::OrderRecord;
use uuid::Uuid;

use crate::StockBook;

/// The outcome of one admission sweep over the pending queue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepPlan {
    /// Orders to promote to `ready`, in promotion (FIFO) order.
    pub promoted: Vec<Uuid>,
    /// The order the scan halted on (first shortage), if any.
    pub halted_at: Option<Uuid>,
}

impl SweepPlan {
    pub fn is_noop(&self) -> bool {
        self.promoted.is_empty()
    }
}

/// Canonical FIFO order: `created_at` ascending, then insertion `seq`.
pub(crate) fn sort_pending_canonical(orders: &mut [OrderRecord]) {
    orders.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.seq.cmp(&b.seq))
    });
}

/// Plan one admission sweep.
///
/// `book` is the consolidated working copy of on-hand stock; it is
/// decremented by each promoted order's requirements so later orders in the
/// same sweep see the stock already claimed. `pending` may arrive in any
/// order; it is sorted canonically here so the plan is deterministic.
///
/// Orders that are not `pending` are the caller's bug to exclude; the
/// planner only sorts and scans what it is given.
pub fn plan_sweep(book: &mut StockBook, mut pending: Vec<OrderRecord>) -> SweepPlan {
    sort_pending_canonical(&mut pending);

    let mut plan = SweepPlan::default();
    for order in &pending {
        if book.reserve(&order.required) {
            plan.promoted.push(order.id);
        } else {
            plan.halted_at = Some(order.id);
            break;
        }
    }
    plan
}
