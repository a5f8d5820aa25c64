//! The strict manual-withdrawal guard.
//!
//! Ad-hoc stock removal has no compensating order-lifecycle bookkeeping, so
//! unlike the transition batches it must read-check-then-write: a
//! withdrawal that would drive stock negative is rejected before any write.

use depot_schemas::ResourceKey;

use crate::StockError;

/// Validate a manual withdrawal of `qty` units against `available` on-hand.
///
/// # Errors
/// - [`StockError::InvalidQuantity`] when `qty <= 0`.
/// - [`StockError::InsufficientStock`] when `qty > available`.
pub fn check_withdrawal(resource: &ResourceKey, available: i64, qty: i64) -> Result<(), StockError> {
    if qty <= 0 {
        return Err(StockError::InvalidQuantity { qty });
    }
    if qty > available {
        return Err(StockError::InsufficientStock {
            resource: resource.clone(),
            requested: qty,
            available,
        });
    }
    Ok(())
}
