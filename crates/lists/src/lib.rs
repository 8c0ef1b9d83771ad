//! Product lists domain module.
//!
//! This crate contains the product-list model and the rules around it,
//! implemented purely as deterministic domain logic (no IO, no storage).

pub mod criteria;
pub mod hooks;
pub mod product_list;
pub mod relation;
pub mod response;

pub use criteria::{Pagination, ProductListCollection, ProductListCriteria};
pub use hooks::{HookResult, HookStack, ProductListHook, ProductListHooks};
pub use product_list::{ProductList, ProductListIdsByType, ProductListType};
pub use relation::RelationDiff;
pub use response::{messages, ProductListResponse};
