//! Record store boundary.
//!
//! Products and carts live in an external document store. The engine only needs
//! find / create / versioned partial update per record; a single `update` is
//! atomic for its record, but nothing spans two records.

pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use shopcart_carts::{CartPatch, ShoppingCart};
use shopcart_core::{CartId, EntityKind, ExpectedVersion, ProductId};
use shopcart_products::{NewProduct, Product, ProductFilter, ProductPatch};

pub use in_memory::{InMemoryCartStore, InMemoryProductStore};
#[cfg(feature = "postgres")]
pub use postgres::{PostgresCartStore, PostgresProductStore};

/// Store operation error.
///
/// These are **infrastructure errors** (missing record on update, stale version,
/// backend failure) as opposed to domain errors (validation, stock rules).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(EntityKind),

    #[error("optimistic concurrency check failed: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Backend(String),
}

/// Product record store.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// All products matching `filter`, in store iteration order.
    async fn find(&self, filter: ProductFilter) -> Result<Vec<Product>, StoreError>;

    /// Persist a new product; the store assigns the identifier.
    async fn create(&self, new: NewProduct) -> Result<Product, StoreError>;

    /// Apply a partial update if the record is still at `expected_version`.
    ///
    /// Returns the updated record (version bumped by one).
    async fn update(
        &self,
        id: ProductId,
        patch: ProductPatch,
        expected_version: ExpectedVersion,
    ) -> Result<Product, StoreError>;
}

/// Shopping cart record store.
#[async_trait]
pub trait CartStore: Send + Sync {
    async fn find_by_id(&self, id: CartId) -> Result<Option<ShoppingCart>, StoreError>;

    /// All carts, in store iteration order.
    async fn find_all(&self) -> Result<Vec<ShoppingCart>, StoreError>;

    /// Persist a new, empty cart; the store assigns the identifier.
    async fn create(&self) -> Result<ShoppingCart, StoreError>;

    /// Apply a partial update if the record is still at `expected_version`.
    async fn update(
        &self,
        id: CartId,
        patch: CartPatch,
        expected_version: ExpectedVersion,
    ) -> Result<ShoppingCart, StoreError>;
}

#[async_trait]
impl<S> ProductStore for Arc<S>
where
    S: ProductStore + ?Sized,
{
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        (**self).find_by_id(id).await
    }

    async fn find(&self, filter: ProductFilter) -> Result<Vec<Product>, StoreError> {
        (**self).find(filter).await
    }

    async fn create(&self, new: NewProduct) -> Result<Product, StoreError> {
        (**self).create(new).await
    }

    async fn update(
        &self,
        id: ProductId,
        patch: ProductPatch,
        expected_version: ExpectedVersion,
    ) -> Result<Product, StoreError> {
        (**self).update(id, patch, expected_version).await
    }
}

#[async_trait]
impl<S> CartStore for Arc<S>
where
    S: CartStore + ?Sized,
{
    async fn find_by_id(&self, id: CartId) -> Result<Option<ShoppingCart>, StoreError> {
        (**self).find_by_id(id).await
    }

    async fn find_all(&self) -> Result<Vec<ShoppingCart>, StoreError> {
        (**self).find_all().await
    }

    async fn create(&self) -> Result<ShoppingCart, StoreError> {
        (**self).create().await
    }

    async fn update(
        &self,
        id: CartId,
        patch: CartPatch,
        expected_version: ExpectedVersion,
    ) -> Result<ShoppingCart, StoreError> {
        (**self).update(id, patch, expected_version).await
    }
}
