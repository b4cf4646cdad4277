//! Service wiring: stores, engine and catalog built from one [`ShopcartConfig`].

use std::sync::Arc;

use crate::cart_engine::CartEngine;
use crate::catalog::Catalog;
use crate::config::ShopcartConfig;
use crate::store::{CartStore, InMemoryCartStore, InMemoryProductStore, ProductStore};

#[cfg(feature = "postgres")]
use crate::store::{PostgresCartStore, PostgresProductStore, StoreError};

/// Everything a caller needs to serve the shop operations.
///
/// The catalog and the engine share the same store handles.
#[derive(Debug)]
pub struct ShopServices<P, C> {
    pub catalog: Catalog<Arc<P>, Arc<C>>,
    pub engine: CartEngine<Arc<P>, Arc<C>>,
}

impl<P, C> ShopServices<P, C>
where
    P: ProductStore,
    C: CartStore,
{
    pub fn new(products: Arc<P>, carts: Arc<C>, config: &ShopcartConfig) -> Self {
        Self {
            catalog: Catalog::new(products.clone(), carts.clone()),
            engine: CartEngine::with_config(products, carts, config.engine.clone()),
        }
    }
}

pub type InMemoryShop = ShopServices<InMemoryProductStore, InMemoryCartStore>;

#[cfg(feature = "postgres")]
pub type PostgresShop = ShopServices<PostgresProductStore, PostgresCartStore>;

/// Fresh, empty in-memory stores.
pub fn build_in_memory(config: &ShopcartConfig) -> InMemoryShop {
    tracing::info!(policy = ?config.engine.checkout_policy, "using in-memory stores");
    ShopServices::new(InMemoryProductStore::arc(), InMemoryCartStore::arc(), config)
}

/// Connect to `DATABASE_URL` and make sure the tables exist.
#[cfg(feature = "postgres")]
pub async fn build_postgres(config: &ShopcartConfig) -> Result<PostgresShop, StoreError> {
    let database_url = config
        .database_url
        .as_deref()
        .ok_or_else(|| StoreError::Backend(format!("{} is not set", crate::config::ENV_DATABASE_URL)))?;

    let pool = sqlx::PgPool::connect(database_url)
        .await
        .map_err(|e| StoreError::Backend(format!("connect: {e}")))?;

    crate::store::postgres::ensure_schema(&pool).await?;
    tracing::info!(policy = ?config.engine.checkout_policy, "using postgres stores");

    Ok(ShopServices::new(
        Arc::new(PostgresProductStore::new(pool.clone())),
        Arc::new(PostgresCartStore::new(pool)),
        config,
    ))
}
