//! Cart mutation engine (application-level orchestration).
//!
//! Both operations are read-decide-write sequences over the product and cart
//! stores:
//!
//! ```text
//! AddProductToCart                     CheckoutCart
//!   load product, load cart              load cart, tally units per product
//!   decide (cart.add_product)            decrement each product (concurrently)
//!   write cart @ version read            reset cart @ version read
//! ```
//!
//! Every write names the version it was decided against. A stale write comes back
//! as a conflict and the sequence is re-run from a fresh read, up to
//! `max_write_attempts` times.
//!
//! Adding to a cart does not reserve stock: two carts may each hold the last unit.
//! Checkout is where stock is actually taken, and under
//! [`CheckoutPolicy::AllOrNothing`] a checkout that cannot be fully covered
//! changes nothing. Decrements already applied when a later step fails are put
//! back (compensated) before the error is returned.

use futures::future::{join_all, try_join_all};
use serde::{Deserialize, Serialize};

use shopcart_carts::{CartPatch, ShoppingCart, UnitTally};
use shopcart_core::{AggregateRoot, CartId, EntityKind, ExpectedVersion, ProductId};
use shopcart_products::Product;

use crate::config::{CheckoutPolicy, EngineConfig};
use crate::error::EngineError;
use crate::store::{CartStore, ProductStore, StoreError};

/// What happened to one product line during checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LineOutcome {
    /// Units were taken out of stock; `remaining` is the stock afterwards.
    Decremented { remaining: u32 },
    /// Stock could not cover the units; nothing was taken.
    Skipped { available: u32 },
    /// The product no longer exists.
    Missing,
    /// The decrement could not be written.
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutLine {
    pub product_id: ProductId,
    pub units: u32,
    pub outcome: LineOutcome,
}

/// Result of a checkout: the emptied cart plus one line per distinct product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutReceipt {
    pub cart: ShoppingCart,
    pub lines: Vec<CheckoutLine>,
}

impl CheckoutReceipt {
    /// Every line was taken out of stock.
    pub fn is_complete(&self) -> bool {
        self.lines
            .iter()
            .all(|l| matches!(l.outcome, LineOutcome::Decremented { .. }))
    }

    /// Lines whose stock was not decremented.
    pub fn unfulfilled(&self) -> impl Iterator<Item = &CheckoutLine> {
        self.lines
            .iter()
            .filter(|l| !matches!(l.outcome, LineOutcome::Decremented { .. }))
    }
}

/// Units taken out of stock during one checkout attempt.
#[derive(Debug, Copy, Clone)]
struct Applied {
    product_id: ProductId,
    units: u32,
}

/// Inventory-aware cart mutations over a product store `P` and a cart store `C`.
#[derive(Debug)]
pub struct CartEngine<P, C> {
    products: P,
    carts: C,
    config: EngineConfig,
}

impl<P, C> CartEngine<P, C> {
    pub fn new(products: P, carts: C) -> Self {
        Self::with_config(products, carts, EngineConfig::default())
    }

    pub fn with_config(products: P, carts: C, config: EngineConfig) -> Self {
        Self {
            products,
            carts,
            config,
        }
    }

    fn attempts(&self) -> u32 {
        self.config.max_write_attempts.max(1)
    }
}

impl<P, C> CartEngine<P, C>
where
    P: ProductStore,
    C: CartStore,
{
    /// Add one unit of `product_id` to `cart_id`.
    ///
    /// Fails with `NotFound(Product)` / `NotFound(Cart)` when either record is
    /// missing (the product is looked up first), and with `InventoryExhausted`
    /// when the cart already holds every unit in stock. Nothing is written on
    /// failure.
    #[tracing::instrument(skip_all, fields(%product_id, %cart_id))]
    pub async fn add_product_to_cart(
        &self,
        product_id: ProductId,
        cart_id: CartId,
    ) -> Result<ShoppingCart, EngineError> {
        let mut last_conflict = String::new();

        for attempt in 1..=self.attempts() {
            let product = self.load_product(product_id).await?;
            let cart = self.load_cart(cart_id).await?;

            let patch = cart.add_product(&product).map_err(|e| {
                tracing::warn!(error = %e, units_held = cart.units_of(product_id), "add to cart rejected");
                EngineError::from(e)
            })?;

            match self
                .carts
                .update(cart_id, patch, ExpectedVersion::Exact(cart.version()))
                .await
            {
                Ok(updated) => {
                    tracing::info!(
                        number_of_items = updated.number_of_items,
                        total_price = %updated.total_price,
                        "product added to cart"
                    );
                    return Ok(updated);
                }
                Err(StoreError::Conflict(msg)) => {
                    tracing::debug!(attempt, "cart changed concurrently; retrying");
                    last_conflict = msg;
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::warn!(attempts = self.attempts(), "giving up on add to cart");
        Err(EngineError::Conflict(last_conflict))
    }

    /// Take every unit in `cart_id` out of stock and empty the cart.
    ///
    /// Behavior on products that cannot cover their units follows the configured
    /// [`CheckoutPolicy`]. Checking out an empty cart succeeds without writing.
    ///
    /// When a step fails after stock was taken, the taken units are put back
    /// before the error is returned. A put-back that itself fails is logged at
    /// `error` level and not retried further; that product stays decremented.
    #[tracing::instrument(skip_all, fields(%cart_id, policy = ?self.config.checkout_policy))]
    pub async fn checkout_cart(&self, cart_id: CartId) -> Result<CheckoutReceipt, EngineError> {
        let mut last_conflict = String::new();

        for attempt in 1..=self.attempts() {
            let cart = self.load_cart(cart_id).await?;

            if cart.is_empty() && cart.number_of_items == 0 && cart.total_price.is_zero() {
                tracing::info!("cart already empty; nothing to check out");
                return Ok(CheckoutReceipt {
                    cart,
                    lines: Vec::new(),
                });
            }

            let tally = cart.tally();
            let (lines, applied) = match self.config.checkout_policy {
                CheckoutPolicy::AllOrNothing => self.take_stock_all_or_nothing(&tally).await?,
                CheckoutPolicy::BestEffort => self.take_stock_best_effort(&tally).await,
            };

            match self
                .carts
                .update(cart_id, CartPatch::reset(), ExpectedVersion::Exact(cart.version()))
                .await
            {
                Ok(reset) => {
                    let receipt = CheckoutReceipt { cart: reset, lines };
                    tracing::info!(
                        lines = receipt.lines.len(),
                        unfulfilled = receipt.unfulfilled().count(),
                        "cart checked out"
                    );
                    return Ok(receipt);
                }
                Err(StoreError::Conflict(msg)) => {
                    tracing::debug!(attempt, "cart changed during checkout; restoring stock and retrying");
                    self.compensate(&applied).await;
                    last_conflict = msg;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "cart reset failed; restoring stock");
                    self.compensate(&applied).await;
                    return Err(e.into());
                }
            }
        }

        tracing::warn!(attempts = self.attempts(), "giving up on checkout");
        Err(EngineError::Conflict(last_conflict))
    }

    /// Verify every line first, then decrement all of them; on any failure put
    /// back what was taken and return the error.
    async fn take_stock_all_or_nothing(
        &self,
        tally: &[UnitTally],
    ) -> Result<(Vec<CheckoutLine>, Vec<Applied>), EngineError> {
        let products = try_join_all(tally.iter().map(|line| self.load_product(line.product_id))).await?;

        for (line, product) in tally.iter().zip(&products) {
            if let Err(e) = product.decrement(line.units) {
                tracing::warn!(product_id = %line.product_id, error = %e, "checkout rejected");
                return Err(e.into());
            }
        }

        let results = join_all(
            tally
                .iter()
                .zip(products)
                .map(|(line, product)| self.decrement_stock(line.product_id, line.units, Some(product))),
        )
        .await;

        let mut lines = Vec::with_capacity(tally.len());
        let mut applied = Vec::with_capacity(tally.len());
        let mut first_error = None;

        for (line, result) in tally.iter().zip(results) {
            match result {
                Ok(updated) => {
                    applied.push(Applied {
                        product_id: line.product_id,
                        units: line.units,
                    });
                    lines.push(CheckoutLine {
                        product_id: line.product_id,
                        units: line.units,
                        outcome: LineOutcome::Decremented {
                            remaining: updated.inventory_count,
                        },
                    });
                }
                Err(e) => {
                    tracing::warn!(product_id = %line.product_id, error = %e, "decrement failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(e) = first_error {
            self.compensate(&applied).await;
            return Err(e);
        }

        Ok((lines, applied))
    }

    /// Decrement every line that can be covered; report the rest per line.
    async fn take_stock_best_effort(&self, tally: &[UnitTally]) -> (Vec<CheckoutLine>, Vec<Applied>) {
        let results = join_all(
            tally
                .iter()
                .map(|line| self.decrement_stock(line.product_id, line.units, None)),
        )
        .await;

        let mut lines = Vec::with_capacity(tally.len());
        let mut applied = Vec::new();

        for (line, result) in tally.iter().zip(results) {
            let outcome = match result {
                Ok(updated) => {
                    applied.push(Applied {
                        product_id: line.product_id,
                        units: line.units,
                    });
                    LineOutcome::Decremented {
                        remaining: updated.inventory_count,
                    }
                }
                Err(EngineError::InsufficientInventory { available, .. }) => {
                    tracing::warn!(product_id = %line.product_id, units = line.units, available, "insufficient stock; line skipped");
                    LineOutcome::Skipped { available }
                }
                Err(EngineError::NotFound(_)) => {
                    tracing::warn!(product_id = %line.product_id, "product missing; line skipped");
                    LineOutcome::Missing
                }
                Err(e) => {
                    tracing::warn!(product_id = %line.product_id, error = %e, "decrement failed; line skipped");
                    LineOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            };
            lines.push(CheckoutLine {
                product_id: line.product_id,
                units: line.units,
                outcome,
            });
        }

        (lines, applied)
    }

    /// Take `units` out of stock, re-reading and re-checking on stale versions.
    async fn decrement_stock(
        &self,
        product_id: ProductId,
        units: u32,
        preloaded: Option<Product>,
    ) -> Result<Product, EngineError> {
        let mut current = preloaded;
        let mut last_conflict = String::new();

        for attempt in 1..=self.attempts() {
            let product = match current.take() {
                Some(p) => p,
                None => self.load_product(product_id).await?,
            };
            let patch = product.decrement(units)?;

            match self
                .products
                .update(product_id, patch, ExpectedVersion::Exact(product.version()))
                .await
            {
                Ok(updated) => {
                    tracing::info!(%product_id, units, remaining = updated.inventory_count, "removed inventory");
                    return Ok(updated);
                }
                Err(StoreError::Conflict(msg)) => {
                    tracing::debug!(%product_id, attempt, "product changed concurrently; retrying decrement");
                    last_conflict = msg;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(EngineError::Conflict(last_conflict))
    }

    /// Put `units` back into stock, re-reading on stale versions.
    async fn restock(&self, product_id: ProductId, units: u32) -> Result<Product, EngineError> {
        let mut last_conflict = String::new();

        for _ in 0..self.attempts() {
            let product = self.load_product(product_id).await?;
            let patch = product.restock(units)?;

            match self
                .products
                .update(product_id, patch, ExpectedVersion::Exact(product.version()))
                .await
            {
                Ok(updated) => return Ok(updated),
                Err(StoreError::Conflict(msg)) => last_conflict = msg,
                Err(e) => return Err(e.into()),
            }
        }

        Err(EngineError::Conflict(last_conflict))
    }

    /// Undo decrements applied during a failed checkout attempt.
    ///
    /// Failures here are logged, not returned: the caller is already reporting
    /// the error that triggered compensation.
    async fn compensate(&self, applied: &[Applied]) {
        if applied.is_empty() {
            return;
        }

        let results = join_all(applied.iter().map(|a| self.restock(a.product_id, a.units))).await;

        for (a, result) in applied.iter().zip(results) {
            match result {
                Ok(p) => {
                    tracing::info!(product_id = %a.product_id, units = a.units, inventory_count = p.inventory_count, "restored inventory")
                }
                Err(e) => {
                    tracing::error!(product_id = %a.product_id, units = a.units, error = %e, "failed to restore inventory")
                }
            }
        }
    }

    async fn load_product(&self, product_id: ProductId) -> Result<Product, EngineError> {
        self.products
            .find_by_id(product_id)
            .await?
            .ok_or(EngineError::NotFound(EntityKind::Product))
    }

    async fn load_cart(&self, cart_id: CartId) -> Result<ShoppingCart, EngineError> {
        self.carts
            .find_by_id(cart_id)
            .await?
            .ok_or(EngineError::NotFound(EntityKind::Cart))
    }
}
