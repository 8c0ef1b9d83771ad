//! Infrastructure layer: storage, lookups, list writes, cart enforcement and wiring.

pub mod cart_filter;
pub mod config;
pub mod facade;
pub mod manager;
pub mod repository;
pub mod restriction_index;
pub mod store;

#[cfg(test)]
mod integration_tests;

pub use cart_filter::CartRestrictionFilter;
pub use config::{build_facade, ConfigError, ProductListConfig};
pub use facade::ProductListFacade;
pub use manager::{ProductListError, ProductListWriter};
pub use repository::{PageLimits, ProductListRepository};
pub use restriction_index::RestrictionIndex;
pub use store::{InMemoryProductListStore, PostgresProductListStore, ProductListStore, StoreError};
