//! Domain error model.

use thiserror::Error;

use crate::id::ProductId;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// The kind of record a lookup was aimed at.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Product,
    Cart,
}

impl core::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            EntityKind::Product => f.write_str("product"),
            EntityKind::Cart => f.write_str("shopping cart"),
        }
    }
}

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, stock rules). Storage failures belong to the infra layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. empty title, negative price).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A referenced record does not exist.
    #[error("{0} not found")]
    NotFound(EntityKind),

    /// Adding one more unit would exceed the product's stock.
    #[error("product inventory has run out: {product_id}")]
    InventoryExhausted { product_id: ProductId },

    /// Checkout requested more units than the product has in stock.
    #[error("insufficient inventory for {product_id}: requested {requested}, available {available}")]
    InsufficientInventory {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// A conflict occurred (stale version / optimistic concurrency).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn product_not_found() -> Self {
        Self::NotFound(EntityKind::Product)
    }

    pub fn cart_not_found() -> Self {
        Self::NotFound(EntityKind::Cart)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_messages_name_the_missing_entity() {
        assert_eq!(DomainError::product_not_found().to_string(), "product not found");
        assert_eq!(DomainError::cart_not_found().to_string(), "shopping cart not found");
    }

    #[test]
    fn insufficient_inventory_message_carries_counts() {
        let product_id = ProductId::new();
        let err = DomainError::InsufficientInventory {
            product_id,
            requested: 3,
            available: 1,
        };
        let msg = err.to_string();
        assert!(msg.contains("requested 3"));
        assert!(msg.contains("available 1"));
        assert!(msg.contains(&product_id.to_string()));
    }
}
