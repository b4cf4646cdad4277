//! Read-only lookups and record creation.
//!
//! Lookups delegate straight to the stores; the only composition is resolving a
//! cart's product ids into product records for [`Catalog::cart_details`].

use futures::future::join_all;
use serde::{Deserialize, Serialize};

use shopcart_carts::ShoppingCart;
use shopcart_core::{CartId, EntityKind, ProductId};
use shopcart_products::{CreateProduct, Product, ProductFilter};

use crate::error::EngineError;
use crate::store::{CartStore, ProductStore};

/// One unit in a cart, resolved against the product store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartEntry {
    pub product_id: ProductId,
    /// `None` when the product no longer exists.
    pub product: Option<Product>,
}

/// A cart together with its resolved product entries (cart order, one per unit).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartDetails {
    pub cart: ShoppingCart,
    pub entries: Vec<CartEntry>,
}

impl CartDetails {
    pub fn missing(&self) -> impl Iterator<Item = ProductId> + '_ {
        self.entries
            .iter()
            .filter(|e| e.product.is_none())
            .map(|e| e.product_id)
    }
}

/// Query surface and creation operations over a product store `P` and a cart store `C`.
#[derive(Debug)]
pub struct Catalog<P, C> {
    products: P,
    carts: C,
}

impl<P, C> Catalog<P, C> {
    pub fn new(products: P, carts: C) -> Self {
        Self { products, carts }
    }
}

impl<P, C> Catalog<P, C>
where
    P: ProductStore,
    C: CartStore,
{
    pub async fn get_product(&self, id: ProductId) -> Result<Product, EngineError> {
        self.products
            .find_by_id(id)
            .await?
            .ok_or(EngineError::NotFound(EntityKind::Product))
    }

    pub async fn get_cart(&self, id: CartId) -> Result<ShoppingCart, EngineError> {
        self.carts
            .find_by_id(id)
            .await?
            .ok_or(EngineError::NotFound(EntityKind::Cart))
    }

    pub async fn list_products(&self) -> Result<Vec<Product>, EngineError> {
        Ok(self.products.find(ProductFilter::All).await?)
    }

    /// Products with at least one unit in stock.
    pub async fn list_available_products(&self) -> Result<Vec<Product>, EngineError> {
        Ok(self.products.find(ProductFilter::InStock).await?)
    }

    pub async fn list_carts(&self) -> Result<Vec<ShoppingCart>, EngineError> {
        Ok(self.carts.find_all().await?)
    }

    /// Load a cart and resolve each of its product ids.
    ///
    /// Each unit is looked up on its own (a product held twice is fetched twice);
    /// ids that no longer resolve come back as entries without a product.
    pub async fn cart_details(&self, id: CartId) -> Result<CartDetails, EngineError> {
        let cart = self.get_cart(id).await?;

        let lookups = join_all(cart.products.iter().map(|pid| self.products.find_by_id(*pid))).await;

        let entries = cart
            .products
            .iter()
            .zip(lookups)
            .map(|(pid, found)| {
                Ok(CartEntry {
                    product_id: *pid,
                    product: found?,
                })
            })
            .collect::<Result<Vec<_>, EngineError>>()?;

        Ok(CartDetails { cart, entries })
    }

    /// Validate and persist a new product.
    #[tracing::instrument(skip_all, fields(title = %command.title))]
    pub async fn add_product(&self, command: CreateProduct) -> Result<Product, EngineError> {
        let new = command.validate().map_err(|e| {
            tracing::warn!(error = %e, "product rejected");
            EngineError::from(e)
        })?;

        let product = self.products.create(new).await?;
        tracing::info!(product_id = %product.id, inventory_count = product.inventory_count, "product added");
        Ok(product)
    }

    /// Persist a new, empty cart.
    #[tracing::instrument(skip_all)]
    pub async fn add_cart(&self) -> Result<ShoppingCart, EngineError> {
        let cart = self.carts.create().await?;
        tracing::info!(cart_id = %cart.id, "shopping cart added");
        Ok(cart)
    }
}
