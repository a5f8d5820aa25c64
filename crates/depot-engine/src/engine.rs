//! The depot engine: transition orchestration + admission scan.

use std::sync::Arc;

use depot_schemas::{AmmoKind, OrderRecord, OrderStatus, RequiredSet, ResourceKey, StockRow};
use depot_stock::{check_withdrawal, plan_removal, plan_sweep, plan_transition, StockBook, TransitionPlan};
use uuid::Uuid;

use crate::error::EngineError;
use crate::store::{OrderStore, StockStore};

// ---------------------------------------------------------------------------
// ProductionBatch
// ---------------------------------------------------------------------------

/// One production run: consume raw materials, yield one finished kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductionBatch {
    /// Materials consumed, `(resource, units)` with units > 0.
    pub consumes: Vec<(ResourceKey, i64)>,
    /// The finished kind produced.
    pub output: AmmoKind,
    /// Units of `output` produced, > 0.
    pub output_units: i64,
}

// ---------------------------------------------------------------------------
// SweepReport
// ---------------------------------------------------------------------------

/// What one admission scan did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Orders promoted to `ready`, in FIFO order.
    pub promoted: Vec<Uuid>,
    /// The order the scan halted on (first shortage), if any.
    pub halted_at: Option<Uuid>,
    /// Stock/ledger writes that failed inside the scan (logged, not fatal).
    pub write_failures: u64,
}

// ---------------------------------------------------------------------------
// DepotEngine
// ---------------------------------------------------------------------------

/// The stock reservation and order-admission engine.
///
/// Holds the two ledgers behind trait objects so the same engine runs over
/// the in-memory store and PostgreSQL. All mutating operations finish with
/// an admission scan over the pending queue; scan failures never propagate
/// to the caller whose primary mutation already succeeded.
#[derive(Clone)]
pub struct DepotEngine {
    stock: Arc<dyn StockStore>,
    orders: Arc<dyn OrderStore>,
}

impl DepotEngine {
    pub fn new(stock: Arc<dyn StockStore>, orders: Arc<dyn OrderStore>) -> Self {
        Self { stock, orders }
    }

    // -----------------------------------------------------------------------
    // Order lifecycle
    // -----------------------------------------------------------------------

    /// Create a new `pending` order, then scan.
    pub async fn create_order(&self, required: RequiredSet) -> Result<OrderRecord, EngineError> {
        validate_required(&required)?;
        let record = self.orders.insert(required).await?;
        tracing::info!(order_id = %record.id, seq = record.seq, "order created");
        self.scan_after_mutation().await;
        Ok(record)
    }

    /// Apply a transition to one order: new requirements and/or new status.
    ///
    /// The stock adjustments the transition requires are applied first
    /// (best-effort; per-item failures are logged), the order-ledger state
    /// is **always** written afterwards, and the admission scan always runs;
    /// a failed stock adjustment never blocks either.
    pub async fn update_order(
        &self,
        id: Uuid,
        new_required: Option<RequiredSet>,
        new_status: OrderStatus,
    ) -> Result<OrderRecord, EngineError> {
        let prev = self
            .orders
            .fetch(id)
            .await?
            .ok_or(EngineError::OrderNotFound { id })?;
        let new_required = new_required.unwrap_or_else(|| prev.required.clone());
        validate_required(&new_required)?;

        let plan = plan_transition(prev.status, &prev.required, new_status, &new_required);
        let failed = self.apply_plan(&plan, "transition").await;
        if failed > 0 {
            tracing::warn!(
                order_id = %id,
                failed,
                "transition stock batch degraded; ledger write proceeds"
            );
        }

        self.orders.write_state(id, new_status, &new_required).await?;
        tracing::info!(
            order_id = %id,
            prev_status = %prev.status,
            new_status = %new_status,
            "order transition applied"
        );

        self.scan_after_mutation().await;
        Ok(OrderRecord {
            status: new_status,
            required: new_required,
            ..prev
        })
    }

    /// Delete an order: release its reservation if it holds one, erase the
    /// row, then scan.
    pub async fn delete_order(&self, id: Uuid) -> Result<(), EngineError> {
        let prev = self
            .orders
            .fetch(id)
            .await?
            .ok_or(EngineError::OrderNotFound { id })?;

        let plan = plan_removal(prev.status, &prev.required);
        let failed = self.apply_plan(&plan, "removal").await;
        if failed > 0 {
            tracing::warn!(order_id = %id, failed, "removal credit degraded; row erase proceeds");
        }

        self.orders.remove(id).await?;
        tracing::info!(order_id = %id, "order deleted");
        self.scan_after_mutation().await;
        Ok(())
    }

    pub async fn get_order(&self, id: Uuid) -> Result<OrderRecord, EngineError> {
        self.orders
            .fetch(id)
            .await?
            .ok_or(EngineError::OrderNotFound { id })
    }

    pub async fn list_orders(&self) -> Result<Vec<OrderRecord>, EngineError> {
        Ok(self.orders.list().await?)
    }

    // -----------------------------------------------------------------------
    // Stock mutation
    // -----------------------------------------------------------------------

    /// Direct manual stock edit (signed delta). This is the primary
    /// mutation, so store rejections surface to the caller.
    pub async fn adjust_stock(&self, key: &ResourceKey, delta_units: i64) -> Result<(), EngineError> {
        if delta_units == 0 {
            return Err(EngineError::InvalidQuantity { qty: 0 });
        }
        self.stock
            .apply_delta(key, delta_units)
            .await
            .map_err(|e| EngineError::from_store(e, key))?;
        tracing::info!(resource = %key, delta_units, "manual stock adjustment");
        self.scan_after_mutation().await;
        Ok(())
    }

    /// Strictly-guarded ad-hoc withdrawal (read, check, then write):
    /// never allows stock to go negative. Returns the remaining quantity.
    pub async fn withdraw(&self, key: &ResourceKey, qty: i64) -> Result<i64, EngineError> {
        let available = self
            .stock
            .quantity(key)
            .await?
            .ok_or_else(|| EngineError::ResourceNotFound {
                resource: key.clone(),
            })?;
        check_withdrawal(key, available, qty)?;
        self.stock
            .apply_delta(key, -qty)
            .await
            .map_err(|e| EngineError::from_store(e, key))?;
        tracing::info!(resource = %key, qty, remaining = available - qty, "manual withdrawal");
        self.scan_after_mutation().await;
        Ok(available - qty)
    }

    /// Batch production: consume raw materials, credit the finished kind.
    /// The consumed set is guarded like a withdrawal before any write.
    pub async fn produce(&self, batch: ProductionBatch) -> Result<(), EngineError> {
        if batch.output_units <= 0 {
            return Err(EngineError::InvalidQuantity {
                qty: batch.output_units,
            });
        }

        // Guard every consumed material first; no write happens on a trip.
        for (key, units) in &batch.consumes {
            let available = self
                .stock
                .quantity(key)
                .await?
                .ok_or_else(|| EngineError::ResourceNotFound {
                    resource: key.clone(),
                })?;
            check_withdrawal(key, available, *units)?;
        }

        for (key, units) in &batch.consumes {
            self.stock
                .apply_delta(key, -units)
                .await
                .map_err(|e| EngineError::from_store(e, key))?;
        }

        let output_key = ResourceKey::ammo(batch.output);
        self.stock
            .apply_delta(&output_key, batch.output_units)
            .await
            .map_err(|e| EngineError::from_store(e, &output_key))?;

        tracing::info!(
            output = %output_key,
            units = batch.output_units,
            consumed = batch.consumes.len(),
            "production batch applied"
        );
        self.scan_after_mutation().await;
        Ok(())
    }

    pub async fn stock_rows(&self) -> Result<Vec<StockRow>, EngineError> {
        Ok(self.stock.rows().await?)
    }

    // -----------------------------------------------------------------------
    // Admission scan
    // -----------------------------------------------------------------------

    /// Run one FIFO admission scan over the pending queue.
    ///
    /// Promotion to `ready` reserves physically: each promoted order's
    /// requirements are debited from the stock ledger before its status
    /// write, so the committed-never-exceeds-on-hand invariant holds across
    /// sweeps. The scan halts at the first order it cannot satisfy.
    ///
    /// Write failures inside the scan are logged and counted, never fatal:
    /// the scan continues with the remaining promotions.
    pub async fn run_admission_scan(&self) -> Result<SweepReport, EngineError> {
        let rows = self.stock.rows().await?;
        let pending = self.orders.pending_fifo().await?;

        let mut book = StockBook::from_rows(&rows);
        let plan = plan_sweep(&mut book, pending.clone());

        let mut report = SweepReport {
            promoted: Vec::new(),
            halted_at: plan.halted_at,
            write_failures: 0,
        };

        for id in plan.promoted {
            // The plan was computed from this exact pending set.
            let Some(order) = pending.iter().find(|o| o.id == id) else {
                continue;
            };

            let debits = plan_transition(
                OrderStatus::Pending,
                &order.required,
                OrderStatus::Ready,
                &order.required,
            );
            report.write_failures += self.apply_plan(&debits, "admission").await;

            match self
                .orders
                .write_state(id, OrderStatus::Ready, &order.required)
                .await
            {
                Ok(()) => {
                    tracing::info!(order_id = %id, "order promoted to ready");
                    report.promoted.push(id);
                }
                Err(err) => {
                    report.write_failures += 1;
                    tracing::warn!(order_id = %id, error = %err, "promotion status write failed");
                }
            }
        }

        Ok(report)
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    /// Apply a transition plan best-effort. Each adjustment is independent;
    /// a failed item is logged and counted, the rest still apply.
    async fn apply_plan(&self, plan: &TransitionPlan, context: &str) -> u64 {
        let mut failed = 0u64;
        for adj in &plan.adjustments {
            if let Err(err) = self.stock.apply_delta(&adj.key, adj.delta_units).await {
                failed += 1;
                tracing::warn!(
                    resource = %adj.key,
                    delta_units = adj.delta_units,
                    context,
                    error = %err,
                    "stock adjustment failed (best-effort batch continues)"
                );
            }
        }
        failed
    }

    /// Post-mutation scan trigger. The triggering mutation already
    /// succeeded, so scan failures are logged, never propagated.
    async fn scan_after_mutation(&self) {
        match self.run_admission_scan().await {
            Ok(report) if !report.promoted.is_empty() => {
                tracing::info!(promoted = report.promoted.len(), "admission scan promoted orders");
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(error = %err, "admission scan failed after mutation");
            }
        }
    }
}

fn validate_required(required: &RequiredSet) -> Result<(), EngineError> {
    if let Some((_, qty)) = required.iter().find(|(_, q)| *q < 0) {
        return Err(EngineError::InvalidQuantity { qty });
    }
    Ok(())
}
