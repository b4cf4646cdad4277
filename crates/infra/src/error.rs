//! Errors surfaced by the engine and catalog to their callers.

use thiserror::Error;

use shopcart_core::{DomainError, EntityKind, ProductId};

use crate::store::StoreError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A product or cart does not exist.
    #[error("{0} not found")]
    NotFound(EntityKind),

    /// The cart already holds every unit in stock of this product.
    #[error("product inventory has run out: {product_id}")]
    InventoryExhausted { product_id: ProductId },

    /// Checkout could not take the requested units out of stock.
    #[error("insufficient inventory for {product_id}: requested {requested}, available {available}")]
    InsufficientInventory {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// Input failed validation; nothing was persisted.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Domain invariant failure (deterministic).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// Optimistic concurrency kept failing after the configured attempts.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The backing store failed.
    #[error("store error: {0}")]
    Store(String),
}

impl From<DomainError> for EngineError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => EngineError::Validation(msg),
            DomainError::InvalidId(msg) => EngineError::Validation(msg),
            DomainError::InvariantViolation(msg) => EngineError::InvariantViolation(msg),
            DomainError::NotFound(kind) => EngineError::NotFound(kind),
            DomainError::InventoryExhausted { product_id } => {
                EngineError::InventoryExhausted { product_id }
            }
            DomainError::InsufficientInventory {
                product_id,
                requested,
                available,
            } => EngineError::InsufficientInventory {
                product_id,
                requested,
                available,
            },
            DomainError::Conflict(msg) => EngineError::Conflict(msg),
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(kind) => EngineError::NotFound(kind),
            StoreError::Conflict(msg) => EngineError::Conflict(msg),
            StoreError::Backend(msg) => EngineError::Store(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_keep_their_kind() {
        let product_id = ProductId::new();
        assert_eq!(
            EngineError::from(DomainError::InventoryExhausted { product_id }),
            EngineError::InventoryExhausted { product_id }
        );
        assert_eq!(
            EngineError::from(DomainError::cart_not_found()),
            EngineError::NotFound(EntityKind::Cart)
        );
        assert!(matches!(
            EngineError::from(DomainError::invalid_id("CartId: bad")),
            EngineError::Validation(_)
        ));
    }

    #[test]
    fn store_errors_map_to_conflict_or_store() {
        assert!(matches!(
            EngineError::from(StoreError::Conflict("stale".into())),
            EngineError::Conflict(_)
        ));
        assert_eq!(
            EngineError::from(StoreError::Backend("down".into())).to_string(),
            "store error: down"
        );
    }
}
