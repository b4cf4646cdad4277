use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shopcart_core::{AggregateRoot, DomainError, DomainResult, Price, ProductId};

/// Product record: a sellable item with a unit price and a stock count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub price: Price,
    pub inventory_count: u32,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Materialize a freshly created record (version 1) from validated input.
    pub fn create(id: ProductId, new: NewProduct, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: new.title,
            price: new.price,
            inventory_count: new.inventory_count,
            version: 1,
            updated_at: now,
        }
    }

    /// Whether at least one unit is in stock.
    pub fn is_available(&self) -> bool {
        self.inventory_count > 0
    }

    /// Stock left once `units_held` units are set aside (may be negative when a
    /// cart holds more than the current stock).
    pub fn remaining_after(&self, units_held: usize) -> i64 {
        i64::from(self.inventory_count) - i64::try_from(units_held).unwrap_or(i64::MAX)
    }

    /// Decide the patch that takes `units` out of stock.
    ///
    /// Fails with `InsufficientInventory` when the stock cannot cover `units`;
    /// nothing is decided in that case.
    pub fn decrement(&self, units: u32) -> DomainResult<ProductPatch> {
        let remaining = self.inventory_count.checked_sub(units).ok_or(
            DomainError::InsufficientInventory {
                product_id: self.id,
                requested: units,
                available: self.inventory_count,
            },
        )?;
        Ok(ProductPatch::inventory(remaining))
    }

    /// Decide the patch that puts `units` back into stock.
    pub fn restock(&self, units: u32) -> DomainResult<ProductPatch> {
        let restored = self.inventory_count.checked_add(units).ok_or_else(|| {
            DomainError::invariant(format!(
                "inventory overflow restocking {units} units of {}",
                self.id
            ))
        })?;
        Ok(ProductPatch::inventory(restored))
    }

    /// Apply a partial update, bumping the version.
    pub fn apply_patch(&mut self, patch: &ProductPatch, now: DateTime<Utc>) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(count) = patch.inventory_count {
            self.inventory_count = count;
        }
        self.version += 1;
        self.updated_at = now;
    }
}

impl AggregateRoot for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateProduct (raw, unvalidated input).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProduct {
    pub title: String,
    pub price: Decimal,
    pub inventory_count: i64,
}

impl CreateProduct {
    pub fn new(title: impl Into<String>, price: Decimal, inventory_count: i64) -> Self {
        Self {
            title: title.into(),
            price,
            inventory_count,
        }
    }

    /// Validate the command into a `NewProduct` ready to be persisted.
    pub fn validate(self) -> DomainResult<NewProduct> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(DomainError::validation("title cannot be empty"));
        }

        let price = Price::new(self.price)?;

        if self.inventory_count < 0 {
            return Err(DomainError::validation(format!(
                "inventoryCount cannot be negative (got {})",
                self.inventory_count
            )));
        }
        let inventory_count = u32::try_from(self.inventory_count).map_err(|_| {
            DomainError::validation(format!(
                "inventoryCount out of range (got {})",
                self.inventory_count
            ))
        })?;

        Ok(NewProduct {
            title: title.to_string(),
            price,
            inventory_count,
        })
    }
}

/// Validated product fields, not yet assigned an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub title: String,
    pub price: Price,
    pub inventory_count: u32,
}

/// Typed partial update for a product record (`None` leaves a field as is).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    pub title: Option<String>,
    pub price: Option<Price>,
    pub inventory_count: Option<u32>,
}

impl ProductPatch {
    pub fn inventory(count: u32) -> Self {
        Self {
            inventory_count: Some(count),
            ..Self::default()
        }
    }
}

/// Product listing filter.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductFilter {
    #[default]
    All,
    /// Only products with `inventory_count > 0`.
    InStock,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        match self {
            ProductFilter::All => true,
            ProductFilter::InStock => product.is_available(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn product(inventory_count: u32) -> Product {
        let new = CreateProduct::new("Google Pixel XL", dec("299.99"), i64::from(inventory_count))
            .validate()
            .unwrap();
        Product::create(ProductId::new(), new, Utc::now())
    }

    #[test]
    fn create_product_trims_title_and_starts_at_version_one() {
        let new = CreateProduct::new("  Fitbit Versa ", dec("155.49"), 39)
            .validate()
            .unwrap();
        assert_eq!(new.title, "Fitbit Versa");

        let p = Product::create(ProductId::new(), new, Utc::now());
        assert_eq!(p.version(), 1);
        assert_eq!(p.inventory_count, 39);
        assert_eq!(p.price.amount(), dec("155.49"));
    }

    #[test]
    fn create_product_rejects_empty_title() {
        let err = CreateProduct::new("   ", dec("1"), 1).validate().unwrap_err();
        match err {
            DomainError::Validation(msg) => assert!(msg.contains("title")),
            _ => panic!("Expected Validation error for empty title"),
        }
    }

    #[test]
    fn create_product_rejects_negative_price() {
        let err = CreateProduct::new("Macbook Pro 2018", dec("-1299.99"), 2)
            .validate()
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn create_product_rejects_negative_or_oversized_inventory() {
        let err = CreateProduct::new("Macbook Pro 2018", dec("1299.99"), -1)
            .validate()
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = CreateProduct::new("Macbook Pro 2018", dec("1299.99"), i64::from(u32::MAX) + 1)
            .validate()
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn zero_inventory_is_a_valid_product_but_not_available() {
        let p = product(0);
        assert!(!p.is_available());
        assert!(!ProductFilter::InStock.matches(&p));
        assert!(ProductFilter::All.matches(&p));
    }

    #[test]
    fn remaining_after_can_go_negative() {
        let p = product(2);
        assert_eq!(p.remaining_after(0), 2);
        assert_eq!(p.remaining_after(2), 0);
        assert_eq!(p.remaining_after(5), -3);
    }

    #[test]
    fn decrement_rejects_more_than_stock() {
        let p = product(1);
        let err = p.decrement(2).unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientInventory {
                product_id: p.id,
                requested: 2,
                available: 1,
            }
        );
    }

    #[test]
    fn decrement_to_zero_is_allowed() {
        let p = product(1);
        assert_eq!(p.decrement(1).unwrap(), ProductPatch::inventory(0));
    }

    #[test]
    fn apply_patch_only_touches_set_fields_and_bumps_version() {
        let mut p = product(5);
        let title = p.title.clone();
        let price = p.price;

        p.apply_patch(&ProductPatch::inventory(3), Utc::now());

        assert_eq!(p.inventory_count, 3);
        assert_eq!(p.title, title);
        assert_eq!(p.price, price);
        assert_eq!(p.version(), 2);
    }

    #[test]
    fn restock_detects_overflow() {
        let mut p = product(0);
        p.inventory_count = u32::MAX;
        assert!(matches!(p.restock(1), Err(DomainError::InvariantViolation(_))));
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let p = product(19);
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["inventoryCount"], 19);
        assert_eq!(json["title"], "Google Pixel XL");
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 512,
                ..ProptestConfig::default()
            })]

            /// Property: decrement followed by restock of the same units is the identity on stock.
            #[test]
            fn decrement_then_restock_restores_stock(stock in 0u32..10_000, units in 0u32..10_000) {
                let mut p = product(stock);
                match p.decrement(units) {
                    Ok(patch) => {
                        p.apply_patch(&patch, Utc::now());
                        prop_assert_eq!(p.inventory_count, stock - units);
                        let back = p.restock(units).unwrap();
                        p.apply_patch(&back, Utc::now());
                        prop_assert_eq!(p.inventory_count, stock);
                    }
                    Err(DomainError::InsufficientInventory { requested, available, .. }) => {
                        prop_assert!(units > stock);
                        prop_assert_eq!(requested, units);
                        prop_assert_eq!(available, stock);
                    }
                    Err(other) => prop_assert!(false, "unexpected error {:?}", other),
                }
            }
        }
    }
}
