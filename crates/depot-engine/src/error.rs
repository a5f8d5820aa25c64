//! Engine-level error taxonomy.

use depot_schemas::ResourceKey;
use depot_stock::StockError;
use uuid::Uuid;

use crate::store::StoreError;

/// Errors surfaced synchronously to callers of the mutating operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A withdrawal/production guard tripped; nothing was written.
    InsufficientStock {
        resource: ResourceKey,
        requested: i64,
        available: i64,
    },
    OrderNotFound { id: Uuid },
    ResourceNotFound { resource: ResourceKey },
    /// A zero or negative quantity where a positive one is required.
    InvalidQuantity { qty: i64 },
    /// Underlying store failure on the primary mutation path.
    Persistence { message: String },
}

impl EngineError {
    /// Map a store failure on the primary mutation path, attributing
    /// not-found and negative-quantity rejections to the resource at hand.
    pub(crate) fn from_store(err: StoreError, resource: &ResourceKey) -> Self {
        match err {
            StoreError::NotFound { .. } => Self::ResourceNotFound {
                resource: resource.clone(),
            },
            StoreError::WouldGoNegative {
                resource,
                delta_units,
                available,
            } => Self::InsufficientStock {
                resource,
                requested: -delta_units,
                available,
            },
            StoreError::Backend { message } => Self::Persistence { message },
        }
    }
}

impl From<StockError> for EngineError {
    fn from(err: StockError) -> Self {
        match err {
            StockError::InvalidQuantity { qty } => Self::InvalidQuantity { qty },
            StockError::InsufficientStock {
                resource,
                requested,
                available,
            } => Self::InsufficientStock {
                resource,
                requested,
                available,
            },
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { what } => Self::Persistence {
                message: format!("row vanished mid-operation: {what}"),
            },
            StoreError::WouldGoNegative {
                resource,
                delta_units,
                available,
            } => Self::InsufficientStock {
                resource,
                requested: -delta_units,
                available,
            },
            StoreError::Backend { message } => Self::Persistence { message },
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InsufficientStock {
                resource,
                requested,
                available,
            } => write!(
                f,
                "insufficient stock for {resource}: requested {requested}, available {available}"
            ),
            Self::OrderNotFound { id } => write!(f, "order not found: {id}"),
            Self::ResourceNotFound { resource } => write!(f, "resource not found: {resource}"),
            Self::InvalidQuantity { qty } => write!(f, "invalid quantity: {qty}"),
            Self::Persistence { message } => write!(f, "persistence failure: {message}"),
        }
    }
}

impl std::error::Error for EngineError {}
