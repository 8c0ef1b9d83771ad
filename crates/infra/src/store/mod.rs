//! Relational storage boundary for product lists.
//!
//! One trait, two backends: an in-memory store for tests/dev and a Postgres
//! store for production.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryProductListStore;
pub use postgres::PostgresProductListStore;
pub use r#trait::{ListRelation, ProductListStore, ProductListWrite, StoreError};
