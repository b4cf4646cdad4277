//! Infrastructure layer: record stores, the cart engine, queries and configuration.

pub mod cart_engine;
pub mod catalog;
pub mod config;
pub mod error;
pub mod services;
pub mod store;


pub use cart_engine::{CartEngine, CheckoutLine, CheckoutReceipt, LineOutcome};
pub use catalog::{CartDetails, CartEntry, Catalog};
pub use config::{CheckoutPolicy, ConfigError, EngineConfig, ShopcartConfig};
pub use error::EngineError;
pub use services::{build_in_memory, InMemoryShop, ShopServices};
#[cfg(feature = "postgres")]
pub use services::{build_postgres, PostgresShop};
pub use store::{CartStore, InMemoryCartStore, InMemoryProductStore, ProductStore, StoreError};
