//! Request and response types for all depot-daemon HTTP endpoints.
//!
//! These types are `Serialize + Deserialize` so they can be JSON-encoded
//! by Axum and decoded by tests.  No business logic lives here.

use depot_schemas::{AmmoKind, OrderStatus, RequiredSet, ResourceKey};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// Error body
// ---------------------------------------------------------------------------

/// Response body when a mutating route is refused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Machine-readable failure class: "insufficient_stock" |
    /// "order_not_found" | "resource_not_found" | "invalid_quantity" |
    /// "persistence"
    pub kind: String,
}

// ---------------------------------------------------------------------------
// /v1/orders
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub required: RequiredSet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateOrderRequest {
    /// New requirements; omit to keep the current set.
    #[serde(default)]
    pub required: Option<RequiredSet>,
    pub status: OrderStatus,
}

// ---------------------------------------------------------------------------
// /v1/stock
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustStockRequest {
    #[serde(flatten)]
    pub resource: ResourceKey,
    pub delta_units: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawRequest {
    #[serde(flatten)]
    pub resource: ResourceKey,
    pub qty: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawResponse {
    pub resource: ResourceKey,
    pub withdrawn: i64,
    pub remaining: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumeItem {
    #[serde(flatten)]
    pub resource: ResourceKey,
    pub units: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProduceRequest {
    pub consumes: Vec<ConsumeItem>,
    pub output: AmmoKind,
    pub output_units: i64,
}

// ---------------------------------------------------------------------------
// /v1/scan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResponse {
    pub promoted: Vec<Uuid>,
    pub halted_at: Option<Uuid>,
    pub write_failures: u64,
}
