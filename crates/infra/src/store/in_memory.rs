use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;

use shopcart_carts::{CartPatch, ShoppingCart};
use shopcart_core::{AggregateRoot, CartId, EntityKind, ExpectedVersion, ProductId};
use shopcart_products::{NewProduct, Product, ProductFilter, ProductPatch};

use super::{CartStore, ProductStore, StoreError};

/// Insertion-ordered record table.
#[derive(Debug)]
struct Table<K, V> {
    order: Vec<K>,
    rows: HashMap<K, V>,
}

impl<K, V> Default for Table<K, V> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            rows: HashMap::new(),
        }
    }
}

impl<K, V> Table<K, V>
where
    K: Copy + Eq + Hash,
    V: Clone,
{
    fn get(&self, key: &K) -> Option<V> {
        self.rows.get(key).cloned()
    }

    fn insert(&mut self, key: K, value: V) {
        if self.rows.insert(key, value).is_none() {
            self.order.push(key);
        }
    }

    fn iter(&self) -> impl Iterator<Item = &V> {
        self.order.iter().filter_map(|k| self.rows.get(k))
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("lock poisoned".to_string())
}

/// In-memory product store.
///
/// Intended for tests/dev. Iterates in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryProductStore {
    table: RwLock<Table<ProductId, Product>>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let table = self.table.read().map_err(|_| poisoned())?;
        Ok(table.get(&id))
    }

    async fn find(&self, filter: ProductFilter) -> Result<Vec<Product>, StoreError> {
        let table = self.table.read().map_err(|_| poisoned())?;
        Ok(table.iter().filter(|p| filter.matches(p)).cloned().collect())
    }

    async fn create(&self, new: NewProduct) -> Result<Product, StoreError> {
        let product = Product::create(ProductId::new(), new, Utc::now());
        let mut table = self.table.write().map_err(|_| poisoned())?;
        table.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update(
        &self,
        id: ProductId,
        patch: ProductPatch,
        expected_version: ExpectedVersion,
    ) -> Result<Product, StoreError> {
        let mut table = self.table.write().map_err(|_| poisoned())?;
        let row = table
            .rows
            .get_mut(&id)
            .ok_or(StoreError::NotFound(EntityKind::Product))?;

        expected_version
            .check(row.version())
            .map_err(|e| StoreError::Conflict(e.to_string()))?;

        row.apply_patch(&patch, Utc::now());
        Ok(row.clone())
    }
}

/// In-memory shopping cart store.
///
/// Intended for tests/dev. Iterates in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryCartStore {
    table: RwLock<Table<CartId, ShoppingCart>>,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn find_by_id(&self, id: CartId) -> Result<Option<ShoppingCart>, StoreError> {
        let table = self.table.read().map_err(|_| poisoned())?;
        Ok(table.get(&id))
    }

    async fn find_all(&self) -> Result<Vec<ShoppingCart>, StoreError> {
        let table = self.table.read().map_err(|_| poisoned())?;
        Ok(table.iter().cloned().collect())
    }

    async fn create(&self) -> Result<ShoppingCart, StoreError> {
        let cart = ShoppingCart::create(CartId::new(), Utc::now());
        let mut table = self.table.write().map_err(|_| poisoned())?;
        table.insert(cart.id, cart.clone());
        Ok(cart)
    }

    async fn update(
        &self,
        id: CartId,
        patch: CartPatch,
        expected_version: ExpectedVersion,
    ) -> Result<ShoppingCart, StoreError> {
        let mut table = self.table.write().map_err(|_| poisoned())?;
        let row = table
            .rows
            .get_mut(&id)
            .ok_or(StoreError::NotFound(EntityKind::Cart))?;

        expected_version
            .check(row.version())
            .map_err(|e| StoreError::Conflict(e.to_string()))?;

        row.apply_patch(&patch, Utc::now());
        Ok(row.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;
    use rust_decimal::Decimal;
    use shopcart_products::CreateProduct;

    fn new_product(title: &str, inventory_count: i64) -> NewProduct {
        CreateProduct::new(title, Decimal::from_str("9.99").unwrap(), inventory_count)
            .validate()
            .unwrap()
    }

    #[tokio::test]
    async fn find_iterates_in_insertion_order_and_filters_stock() {
        let store = InMemoryProductStore::new();
        let a = store.create(new_product("a", 1)).await.unwrap();
        let b = store.create(new_product("b", 0)).await.unwrap();
        let c = store.create(new_product("c", 3)).await.unwrap();

        let all: Vec<_> = store.find(ProductFilter::All).await.unwrap();
        assert_eq!(all.iter().map(|p| p.id).collect::<Vec<_>>(), vec![a.id, b.id, c.id]);

        let in_stock = store.find(ProductFilter::InStock).await.unwrap();
        assert_eq!(in_stock.iter().map(|p| p.id).collect::<Vec<_>>(), vec![a.id, c.id]);
    }

    #[tokio::test]
    async fn update_rejects_stale_version() {
        let store = InMemoryProductStore::new();
        let p = store.create(new_product("p", 5)).await.unwrap();

        let updated = store
            .update(p.id, ProductPatch::inventory(4), ExpectedVersion::Exact(1))
            .await
            .unwrap();
        assert_eq!(updated.inventory_count, 4);
        assert_eq!(updated.version, 2);

        let err = store
            .update(p.id, ProductPatch::inventory(3), ExpectedVersion::Exact(1))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let current = store.find_by_id(p.id).await.unwrap().unwrap();
        assert_eq!(current.inventory_count, 4);
    }

    #[tokio::test]
    async fn update_of_unknown_record_is_not_found() {
        let store = InMemoryCartStore::new();
        let err = store
            .update(CartId::new(), CartPatch::reset(), ExpectedVersion::Any)
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::NotFound(EntityKind::Cart));
    }

    #[tokio::test]
    async fn carts_are_created_empty() {
        let store = InMemoryCartStore::new();
        let cart = store.create().await.unwrap();
        assert!(cart.is_empty());
        assert_eq!(store.find_all().await.unwrap(), vec![cart.clone()]);
        assert_eq!(store.find_by_id(cart.id).await.unwrap(), Some(cart));
    }
}
