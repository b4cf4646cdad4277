//! Products domain module.
//!
//! This crate contains business rules for the product catalog and its stock
//! counts, implemented purely as deterministic domain logic (no IO, no storage).

pub mod product;

pub use product::{CreateProduct, NewProduct, Product, ProductFilter, ProductPatch};
pub use shopcart_core::ProductId;
