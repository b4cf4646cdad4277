//! Postgres-backed record stores.
//!
//! Each record is a row keyed by its UUID. Updates run as a short transaction:
//! lock the row (`SELECT ... FOR UPDATE`), check the expected version, apply the
//! typed patch through the domain type, write the whole row back. That keeps the
//! single-record atomicity the engine relies on without any cross-record locking.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use shopcart_carts::{CartPatch, ShoppingCart};
use shopcart_core::{AggregateRoot, CartId, EntityKind, ExpectedVersion, Price, ProductId};
use shopcart_products::{NewProduct, Product, ProductFilter, ProductPatch};

use super::{CartStore, ProductStore, StoreError};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS products (
    id              UUID PRIMARY KEY,
    title           TEXT NOT NULL,
    price           NUMERIC NOT NULL CHECK (price >= 0),
    inventory_count BIGINT NOT NULL CHECK (inventory_count >= 0),
    version         BIGINT NOT NULL,
    updated_at      TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS shopping_carts (
    id              UUID PRIMARY KEY,
    number_of_items BIGINT NOT NULL CHECK (number_of_items >= 0),
    total_price     NUMERIC NOT NULL CHECK (total_price >= 0),
    products        UUID[] NOT NULL,
    version         BIGINT NOT NULL,
    updated_at      TIMESTAMPTZ NOT NULL
);
"#;

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::PoolClosed => StoreError::Backend(format!("{operation}: connection pool closed")),
        other => StoreError::Backend(format!("{operation}: {other}")),
    }
}

fn corrupt(what: &str, detail: impl core::fmt::Display) -> StoreError {
    StoreError::Backend(format!("corrupt {what} row: {detail}"))
}

/// Create the tables if they do not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::raw_sql(SCHEMA).execute(pool).await.map_err(|e| map_sqlx_error("ensure_schema", e))?;
    Ok(())
}

// =============================================================================
// Row types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    title: String,
    price: Decimal,
    inventory_count: i64,
    version: i64,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ProductId::from_uuid(row.id),
            title: row.title,
            price: Price::new(row.price).map_err(|e| corrupt("product", e))?,
            inventory_count: u32::try_from(row.inventory_count)
                .map_err(|e| corrupt("product", e))?,
            version: u64::try_from(row.version).map_err(|e| corrupt("product", e))?,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    id: Uuid,
    number_of_items: i64,
    total_price: Decimal,
    products: Vec<Uuid>,
    version: i64,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CartRow> for ShoppingCart {
    type Error = StoreError;

    fn try_from(row: CartRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: CartId::from_uuid(row.id),
            number_of_items: u32::try_from(row.number_of_items)
                .map_err(|e| corrupt("shopping cart", e))?,
            total_price: Price::new(row.total_price).map_err(|e| corrupt("shopping cart", e))?,
            products: row.products.into_iter().map(ProductId::from_uuid).collect(),
            version: u64::try_from(row.version).map_err(|e| corrupt("shopping cart", e))?,
            updated_at: row.updated_at,
        })
    }
}

fn db_version(version: u64) -> Result<i64, StoreError> {
    i64::try_from(version).map_err(|_| StoreError::Backend(format!("version out of range: {version}")))
}

// =============================================================================
// Products
// =============================================================================

/// Postgres-backed product store (`products` table).
#[derive(Debug, Clone)]
pub struct PostgresProductStore {
    pool: Arc<PgPool>,
}

impl PostgresProductStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    async fn write(tx: &mut Transaction<'_, Postgres>, product: &Product) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO products (id, title, price, inventory_count, version, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                price = EXCLUDED.price,
                inventory_count = EXCLUDED.inventory_count,
                version = EXCLUDED.version,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.title)
        .bind(product.price.amount())
        .bind(i64::from(product.inventory_count))
        .bind(db_version(product.version)?)
        .bind(product.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("write_product", e))?;
        Ok(())
    }
}

#[async_trait]
impl ProductStore for PostgresProductStore {
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query_as::<_, ProductRow>(
            "SELECT id, title, price, inventory_count, version, updated_at FROM products WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_product", e))?;

        row.map(Product::try_from).transpose()
    }

    async fn find(&self, filter: ProductFilter) -> Result<Vec<Product>, StoreError> {
        let sql = match filter {
            ProductFilter::All => {
                "SELECT id, title, price, inventory_count, version, updated_at FROM products ORDER BY id"
            }
            ProductFilter::InStock => {
                "SELECT id, title, price, inventory_count, version, updated_at FROM products WHERE inventory_count > 0 ORDER BY id"
            }
        };

        let rows = sqlx::query_as::<_, ProductRow>(sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_products", e))?;

        rows.into_iter().map(Product::try_from).collect()
    }

    async fn create(&self, new: NewProduct) -> Result<Product, StoreError> {
        let product = Product::create(ProductId::new(), new, Utc::now());
        let mut tx = self.pool.begin().await.map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Self::write(&mut tx, &product).await?;
        tx.commit().await.map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(product)
    }

    async fn update(
        &self,
        id: ProductId,
        patch: ProductPatch,
        expected_version: ExpectedVersion,
    ) -> Result<Product, StoreError> {
        let mut tx = self.pool.begin().await.map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let row = sqlx::query_as::<_, ProductRow>(
            "SELECT id, title, price, inventory_count, version, updated_at FROM products WHERE id = $1 FOR UPDATE",
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("lock_product", e))?
        .ok_or(StoreError::NotFound(EntityKind::Product))?;

        let mut product = Product::try_from(row)?;
        expected_version
            .check(product.version())
            .map_err(|e| StoreError::Conflict(e.to_string()))?;

        product.apply_patch(&patch, Utc::now());
        Self::write(&mut tx, &product).await?;
        tx.commit().await.map_err(|e| map_sqlx_error("commit_transaction", e))?;

        tracing::debug!(product_id = %id, version = product.version, "product updated");
        Ok(product)
    }
}

// =============================================================================
// Shopping carts
// =============================================================================

/// Postgres-backed cart store (`shopping_carts` table).
#[derive(Debug, Clone)]
pub struct PostgresCartStore {
    pool: Arc<PgPool>,
}

impl PostgresCartStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    async fn write(tx: &mut Transaction<'_, Postgres>, cart: &ShoppingCart) -> Result<(), StoreError> {
        let products: Vec<Uuid> = cart.products.iter().map(|p| *p.as_uuid()).collect();

        sqlx::query(
            r#"
            INSERT INTO shopping_carts (id, number_of_items, total_price, products, version, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                number_of_items = EXCLUDED.number_of_items,
                total_price = EXCLUDED.total_price,
                products = EXCLUDED.products,
                version = EXCLUDED.version,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(cart.id.as_uuid())
        .bind(i64::from(cart.number_of_items))
        .bind(cart.total_price.amount())
        .bind(products)
        .bind(db_version(cart.version)?)
        .bind(cart.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("write_cart", e))?;
        Ok(())
    }
}

#[async_trait]
impl CartStore for PostgresCartStore {
    async fn find_by_id(&self, id: CartId) -> Result<Option<ShoppingCart>, StoreError> {
        let row = sqlx::query_as::<_, CartRow>(
            "SELECT id, number_of_items, total_price, products, version, updated_at FROM shopping_carts WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_cart", e))?;

        row.map(ShoppingCart::try_from).transpose()
    }

    async fn find_all(&self) -> Result<Vec<ShoppingCart>, StoreError> {
        let rows = sqlx::query_as::<_, CartRow>(
            "SELECT id, number_of_items, total_price, products, version, updated_at FROM shopping_carts ORDER BY id",
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_carts", e))?;

        rows.into_iter().map(ShoppingCart::try_from).collect()
    }

    async fn create(&self) -> Result<ShoppingCart, StoreError> {
        let cart = ShoppingCart::create(CartId::new(), Utc::now());
        let mut tx = self.pool.begin().await.map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Self::write(&mut tx, &cart).await?;
        tx.commit().await.map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(cart)
    }

    async fn update(
        &self,
        id: CartId,
        patch: CartPatch,
        expected_version: ExpectedVersion,
    ) -> Result<ShoppingCart, StoreError> {
        let mut tx = self.pool.begin().await.map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let row = sqlx::query_as::<_, CartRow>(
            "SELECT id, number_of_items, total_price, products, version, updated_at FROM shopping_carts WHERE id = $1 FOR UPDATE",
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("lock_cart", e))?
        .ok_or(StoreError::NotFound(EntityKind::Cart))?;

        let mut cart = ShoppingCart::try_from(row)?;
        expected_version
            .check(cart.version())
            .map_err(|e| StoreError::Conflict(e.to_string()))?;

        cart.apply_patch(&patch, Utc::now());
        Self::write(&mut tx, &cart).await?;
        tx.commit().await.map_err(|e| map_sqlx_error("commit_transaction", e))?;

        tracing::debug!(cart_id = %id, version = cart.version, "shopping cart updated");
        Ok(cart)
    }
}
