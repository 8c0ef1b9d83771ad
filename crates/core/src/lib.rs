//! `productlist-core`: ids, domain errors and messages shared by every crate.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod message;

pub use error::{DomainError, DomainResult};
pub use id::{CategoryId, ProductAbstractId, ProductConcreteId, ProductListId};
pub use message::Message;
