//! Transition planning: the canonical reservation arithmetic.
//!
//! Every order lifecycle change maps to one [`TransitionPlan`]: the exact
//! batch of stock debits/credits the change requires. Classification is by
//! reservation state ([`OrderStatus::is_reserved`]), not by literal status,
//! which collapses the lifecycle into four branches:
//!
//! - unreserved → unreserved: empty plan (ledger-only update)
//! - unreserved → reserved:   debit the full new requirements
//! - reserved → unreserved:   credit the full old requirements
//! - reserved → reserved:     debit/credit the per-kind delta only
//!
//! Plans never contain zero adjustments; zero deltas are filtered here so
//! callers never submit a no-op debit or credit.

use depot_schemas::{OrderStatus, RequiredSet, ResourceKey};

// ---------------------------------------------------------------------------
// Adjustment
// ---------------------------------------------------------------------------

/// One signed stock mutation: positive = credit, negative = debit.
///
/// Invariant: `delta_units != 0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adjustment {
    pub key: ResourceKey,
    pub delta_units: i64,
}

impl Adjustment {
    pub fn debit(key: ResourceKey, qty: i64) -> Self {
        debug_assert!(qty > 0, "debit qty must be positive");
        Self {
            key,
            delta_units: -qty,
        }
    }

    pub fn credit(key: ResourceKey, qty: i64) -> Self {
        debug_assert!(qty > 0, "credit qty must be positive");
        Self {
            key,
            delta_units: qty,
        }
    }
}

// ---------------------------------------------------------------------------
// TransitionPlan
// ---------------------------------------------------------------------------

/// The stock-adjustment batch one order transition requires.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionPlan {
    pub adjustments: Vec<Adjustment>,
}

impl TransitionPlan {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.adjustments.is_empty()
    }

    /// Total units debited across the plan (sum of negative deltas, as a
    /// positive number). Diagnostic helper for logs and tests.
    pub fn debited_units(&self) -> i64 {
        self.adjustments
            .iter()
            .filter(|a| a.delta_units < 0)
            .map(|a| -a.delta_units)
            .sum()
    }

    /// Total units credited across the plan.
    pub fn credited_units(&self) -> i64 {
        self.adjustments
            .iter()
            .filter(|a| a.delta_units > 0)
            .map(|a| a.delta_units)
            .sum()
    }

    fn debit_all(required: &RequiredSet) -> Self {
        Self {
            adjustments: required
                .iter()
                .map(|(kind, qty)| Adjustment::debit(ResourceKey::ammo(kind), qty))
                .collect(),
        }
    }

    fn credit_all(required: &RequiredSet) -> Self {
        Self {
            adjustments: required
                .iter()
                .map(|(kind, qty)| Adjustment::credit(ResourceKey::ammo(kind), qty))
                .collect(),
        }
    }

    fn from_delta(new: &RequiredSet, old: &RequiredSet) -> Self {
        Self {
            adjustments: new
                .delta(old)
                .into_iter()
                .map(|(kind, d)| {
                    // Needing more means debiting more.
                    if d > 0 {
                        Adjustment::debit(ResourceKey::ammo(kind), d)
                    } else {
                        Adjustment::credit(ResourceKey::ammo(kind), -d)
                    }
                })
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// Compute the stock adjustments for one order transition.
///
/// `prev_*` is the order state read from the ledger before the change;
/// `new_*` is the requested state. The returned plan is applied by the
/// engine before the ledger status write.
pub fn plan_transition(
    prev_status: OrderStatus,
    prev_required: &RequiredSet,
    new_status: OrderStatus,
    new_required: &RequiredSet,
) -> TransitionPlan {
    match (prev_status.is_reserved(), new_status.is_reserved()) {
        (false, false) => TransitionPlan::empty(),
        (false, true) => TransitionPlan::debit_all(new_required),
        (true, false) => TransitionPlan::credit_all(prev_required),
        (true, true) => TransitionPlan::from_delta(new_required, prev_required),
    }
}

/// Compute the stock adjustments for deleting an order: a reserved order
/// releases its full reservation; an unreserved one releases nothing.
pub fn plan_removal(status: OrderStatus, required: &RequiredSet) -> TransitionPlan {
    if status.is_reserved() {
        TransitionPlan::credit_all(required)
    } else {
        TransitionPlan::empty()
    }
}
