//! depot-engine: the order transition engine and admission scan.
//!
//! This crate owns the orchestration the pure core (depot-stock) plans for:
//! it reads and writes the stock and order ledgers through the [`StockStore`]
//! and [`OrderStore`] seams, applies transition plans best-effort, and runs
//! the FIFO admission scan after every mutation.
//!
//! # Error policy
//!
//! Guard violations (`InsufficientStock`, `InvalidQuantity`, the not-found
//! variants) abort the mutating operation **before any stock write** and are
//! surfaced to the caller. Failures inside the post-transition debit/credit
//! batch or inside the admission scan are logged via `tracing` and never
//! surfaced to the original caller: the order-ledger write and the follow-up
//! scan always proceed. Order-ledger correctness is prioritized over strict
//! stock-ledger atomicity.

mod engine;
mod error;
mod store;

pub use engine::{DepotEngine, ProductionBatch, SweepReport};
pub use error::EngineError;
pub use store::{OrderStore, StockStore, StoreError};
