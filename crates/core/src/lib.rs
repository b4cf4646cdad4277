//! Domain foundation building blocks shared by the shopcart crates.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the domain error model, versioning for optimistic concurrency and
//! the `Price` value object shared by products and carts.

pub mod aggregate;
pub mod error;
pub mod id;
pub mod money;
pub mod value_object;

pub use aggregate::{AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult, EntityKind};
pub use id::{CartId, ProductId};
pub use money::Price;
pub use value_object::ValueObject;
