//! Shopping cart domain module.
//!
//! Carts hold one product id per unit added plus running totals. The rules for
//! adding a unit (bounded by the product's stock) and for tallying units at
//! checkout live here as deterministic domain logic (no IO, no storage).

pub mod cart;

pub use cart::{CartPatch, ShoppingCart, UnitTally};
pub use shopcart_core::CartId;
