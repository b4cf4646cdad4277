use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopcart_core::{AggregateRoot, CartId, DomainError, DomainResult, Price, ProductId};
use shopcart_products::Product;

/// Shopping cart record.
///
/// `products` holds one entry per unit added (duplicates allowed), in the order
/// they were added. `total_price` is the sum of unit prices *at the time each unit
/// was added*; it is never recomputed from live prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingCart {
    pub id: CartId,
    pub number_of_items: u32,
    pub total_price: Price,
    pub products: Vec<ProductId>,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

/// Units of a single product held in a cart.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitTally {
    pub product_id: ProductId,
    pub units: u32,
}

impl ShoppingCart {
    /// Materialize a freshly created, empty cart (version 1).
    pub fn create(id: CartId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            number_of_items: 0,
            total_price: Price::ZERO,
            products: Vec::new(),
            version: 1,
            updated_at: now,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Number of units of `product_id` already in the cart.
    pub fn units_of(&self, product_id: ProductId) -> usize {
        self.products.iter().filter(|id| **id == product_id).count()
    }

    /// Decide the patch that adds one unit of `product` to the cart.
    ///
    /// The stock check only counts units already in *this* cart; units sitting in
    /// other carts are not reserved. Fails with `InventoryExhausted` when the
    /// cart already holds every unit in stock.
    pub fn add_product(&self, product: &Product) -> DomainResult<CartPatch> {
        let held = self.units_of(product.id);
        if product.remaining_after(held) <= 0 {
            return Err(DomainError::InventoryExhausted {
                product_id: product.id,
            });
        }

        let number_of_items = self
            .number_of_items
            .checked_add(1)
            .ok_or_else(|| DomainError::invariant("cart item count overflow"))?;

        let total_price = self
            .total_price
            .checked_add(product.price)
            .ok_or_else(|| DomainError::invariant("cart total overflow"))?;

        let mut products = self.products.clone();
        products.push(product.id);

        Ok(CartPatch {
            number_of_items: Some(number_of_items),
            total_price: Some(total_price),
            products: Some(products),
        })
    }

    /// Units per distinct product, in order of first appearance.
    pub fn tally(&self) -> Vec<UnitTally> {
        let mut index: HashMap<ProductId, usize> = HashMap::new();
        let mut lines: Vec<UnitTally> = Vec::new();

        for product_id in &self.products {
            match index.get(product_id) {
                Some(&i) => {
                    if let Some(line) = lines.get_mut(i) {
                        line.units = line.units.saturating_add(1);
                    }
                }
                None => {
                    index.insert(*product_id, lines.len());
                    lines.push(UnitTally {
                        product_id: *product_id,
                        units: 1,
                    });
                }
            }
        }

        lines
    }

    /// Apply a partial update, bumping the version.
    pub fn apply_patch(&mut self, patch: &CartPatch, now: DateTime<Utc>) {
        if let Some(n) = patch.number_of_items {
            self.number_of_items = n;
        }
        if let Some(total) = patch.total_price {
            self.total_price = total;
        }
        if let Some(products) = &patch.products {
            self.products = products.clone();
        }
        self.version += 1;
        self.updated_at = now;
    }

    /// `number_of_items` matches the number of product entries.
    pub fn is_consistent(&self) -> bool {
        usize::try_from(self.number_of_items).is_ok_and(|n| n == self.products.len())
    }
}

impl AggregateRoot for ShoppingCart {
    type Id = CartId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Typed partial update for a cart record (`None` leaves a field as is).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartPatch {
    pub number_of_items: Option<u32>,
    pub total_price: Option<Price>,
    pub products: Option<Vec<ProductId>>,
}

impl CartPatch {
    /// Patch that empties a cart after checkout.
    pub fn reset() -> Self {
        Self {
            number_of_items: Some(0),
            total_price: Some(Price::ZERO),
            products: Some(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;
    use rust_decimal::Decimal;
    use shopcart_products::CreateProduct;

    fn product(price: &str, inventory_count: u32) -> Product {
        let new = CreateProduct::new(
            "Test Product",
            Decimal::from_str(price).unwrap(),
            i64::from(inventory_count),
        )
        .validate()
        .unwrap();
        Product::create(ProductId::new(), new, Utc::now())
    }

    fn empty_cart() -> ShoppingCart {
        ShoppingCart::create(CartId::new(), Utc::now())
    }

    fn add(cart: &mut ShoppingCart, p: &Product) -> DomainResult<()> {
        let patch = cart.add_product(p)?;
        cart.apply_patch(&patch, Utc::now());
        Ok(())
    }

    #[test]
    fn new_cart_is_empty_and_consistent() {
        let cart = empty_cart();
        assert!(cart.is_empty());
        assert!(cart.is_consistent());
        assert!(cart.total_price.is_zero());
        assert_eq!(cart.version(), 1);
    }

    #[test]
    fn add_product_increments_count_total_and_appends_once() {
        let p = product("299.99", 19);
        let mut cart = empty_cart();

        add(&mut cart, &p).unwrap();

        assert_eq!(cart.number_of_items, 1);
        assert_eq!(cart.total_price, p.price);
        assert_eq!(cart.products, vec![p.id]);
        assert_eq!(cart.version(), 2);
    }

    #[test]
    fn add_product_with_zero_inventory_is_exhausted() {
        let p = product("10", 0);
        let cart = empty_cart();

        let err = cart.add_product(&p).unwrap_err();
        assert_eq!(err, DomainError::InventoryExhausted { product_id: p.id });
    }

    #[test]
    fn add_product_stops_at_stock_held_in_this_cart() {
        let p = product("1299.99", 2);
        let mut cart = empty_cart();

        add(&mut cart, &p).unwrap();
        add(&mut cart, &p).unwrap();
        let before = cart.clone();

        let err = cart.add_product(&p).unwrap_err();
        assert!(matches!(err, DomainError::InventoryExhausted { .. }));
        assert_eq!(cart, before);
    }

    #[test]
    fn units_in_other_products_do_not_count_against_stock() {
        let a = product("1", 1);
        let b = product("2", 1);
        let mut cart = empty_cart();

        add(&mut cart, &a).unwrap();
        add(&mut cart, &b).unwrap();

        assert_eq!(cart.units_of(a.id), 1);
        assert_eq!(cart.units_of(b.id), 1);
    }

    #[test]
    fn total_price_is_frozen_at_add_time() {
        let mut p = product("5.00", 10);
        let mut cart = empty_cart();

        add(&mut cart, &p).unwrap();
        p.price = Price::new(Decimal::from_str("7.50").unwrap()).unwrap();
        add(&mut cart, &p).unwrap();

        assert_eq!(cart.total_price.amount(), Decimal::from_str("12.5").unwrap());
    }

    #[test]
    fn tally_counts_units_in_first_appearance_order() {
        let a = product("1", 5);
        let b = product("1", 1);
        let mut cart = empty_cart();
        add(&mut cart, &a).unwrap();
        add(&mut cart, &b).unwrap();
        add(&mut cart, &a).unwrap();

        assert_eq!(
            cart.tally(),
            vec![
                UnitTally { product_id: a.id, units: 2 },
                UnitTally { product_id: b.id, units: 1 },
            ]
        );
    }

    #[test]
    fn reset_patch_empties_the_cart() {
        let p = product("3", 3);
        let mut cart = empty_cart();
        add(&mut cart, &p).unwrap();

        cart.apply_patch(&CartPatch::reset(), Utc::now());

        assert!(cart.is_empty());
        assert_eq!(cart.number_of_items, 0);
        assert!(cart.total_price.is_zero());
        assert!(cart.tally().is_empty());
    }

    #[test]
    fn total_overflow_is_rejected_without_change() {
        let new = CreateProduct::new("huge", Decimal::MAX, 2).validate().unwrap();
        let p = Product::create(ProductId::new(), new, Utc::now());
        let mut cart = empty_cart();
        add(&mut cart, &p).unwrap();
        let before = cart.clone();

        let err = cart.add_product(&p).unwrap_err();

        assert!(matches!(err, DomainError::InvariantViolation(ref msg) if msg.contains("cart total overflow")));
        assert_eq!(cart, before);
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: any sequence of add attempts keeps the cart consistent, never
            /// holds more units than stock, and totals match the accepted prices.
            #[test]
            fn adds_keep_cart_consistent_and_within_stock(
                stocks in prop::collection::vec(0u32..4, 1..5),
                picks in prop::collection::vec(0usize..5, 0..30)
            ) {
                let products: Vec<Product> = stocks
                    .iter()
                    .enumerate()
                    .map(|(i, s)| product(&format!("{}.25", i + 1), *s))
                    .collect();
                let mut cart = empty_cart();
                let mut expected_total = Price::ZERO;

                for pick in picks {
                    let p = &products[pick % products.len()];
                    let held = cart.units_of(p.id);
                    match add(&mut cart, p) {
                        Ok(()) => {
                            prop_assert!(held < p.inventory_count as usize);
                            expected_total = expected_total.checked_add(p.price).unwrap();
                        }
                        Err(DomainError::InventoryExhausted { product_id }) => {
                            prop_assert_eq!(product_id, p.id);
                            prop_assert_eq!(held, p.inventory_count as usize);
                        }
                        Err(other) => prop_assert!(false, "unexpected error {:?}", other),
                    }
                }

                prop_assert!(cart.is_consistent());
                prop_assert_eq!(cart.total_price, expected_total);
                for line in cart.tally() {
                    let p = products.iter().find(|p| p.id == line.product_id).unwrap();
                    prop_assert!(line.units <= p.inventory_count);
                }
            }
        }
    }
}
