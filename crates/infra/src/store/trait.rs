use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use productlist_core::{CategoryId, ProductAbstractId, ProductConcreteId, ProductListId};
use productlist_lists::{Pagination, ProductList, ProductListType};

/// A list-to-target relation row joined with the list's type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRelation<T> {
    pub product_list_id: ProductListId,
    pub list_type: ProductListType,
    pub target: T,
}

/// Everything a store needs to persist one list with its relation sets.
///
/// The relation sets are the *desired* state; the store reconciles them
/// against the persisted rows inside its transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductListWrite {
    pub id: Option<ProductListId>,
    pub title: String,
    pub list_type: ProductListType,
    pub category_ids: BTreeSet<CategoryId>,
    pub product_concrete_ids: BTreeSet<ProductConcreteId>,
}

impl From<&ProductList> for ProductListWrite {
    fn from(list: &ProductList) -> Self {
        Self {
            id: list.id,
            title: list.title.clone(),
            list_type: list.list_type,
            category_ids: list.category_ids.clone(),
            product_concrete_ids: list.product_concrete_ids.clone(),
        }
    }
}

/// Store operation error.
///
/// These are **infrastructure errors**. Business outcomes (not found on read,
/// validation) never surface here.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An update or relation write referenced a list row that does not exist.
    #[error("product list {0} does not exist")]
    MissingRecord(ProductListId),

    #[error("database error during {operation}: {message}")]
    Database {
        operation: &'static str,
        message: String,
    },

    /// A persisted row could not be mapped back into the domain model.
    #[error("corrupt row: {0}")]
    CorruptRow(String),

    #[error("store lock poisoned")]
    Poisoned,
}

/// Relational storage for product lists and the catalog relations they are evaluated against.
///
/// ## Read semantics
///
/// - Missing rows are never an error: single reads return `None`, batch reads
///   return fewer (or no) rows.
/// - Every batch read issues one query regardless of the input length. Empty
///   inputs return empty results without touching storage.
///
/// ## Write semantics
///
/// `save_product_list` and `delete_product_list` are each one atomic unit:
/// the base row and both relation sets commit together or not at all.
///
/// Catalog tables (concrete → abstract, abstract → category) are owned by the
/// catalog; this store only reads them.
#[async_trait::async_trait]
pub trait ProductListStore: Send + Sync {
    /// Base row of a list (relation sets left empty).
    async fn find_product_list(&self, id: ProductListId) -> Result<Option<ProductList>, StoreError>;

    /// Base rows ordered by id ascending, plus the total row count.
    async fn find_product_lists(
        &self,
        pagination: Option<Pagination>,
    ) -> Result<(Vec<ProductList>, u64), StoreError>;

    async fn category_relations(
        &self,
        list_ids: &[ProductListId],
    ) -> Result<Vec<(ProductListId, CategoryId)>, StoreError>;

    async fn product_concrete_relations(
        &self,
        list_ids: &[ProductListId],
    ) -> Result<Vec<(ProductListId, ProductConcreteId)>, StoreError>;

    async fn list_relations_by_category_ids(
        &self,
        category_ids: &[CategoryId],
    ) -> Result<Vec<ListRelation<CategoryId>>, StoreError>;

    async fn list_relations_by_product_concrete_ids(
        &self,
        concrete_ids: &[ProductConcreteId],
    ) -> Result<Vec<ListRelation<ProductConcreteId>>, StoreError>;

    async fn product_abstract_ids_by_concrete_ids(
        &self,
        concrete_ids: &[ProductConcreteId],
    ) -> Result<Vec<(ProductConcreteId, ProductAbstractId)>, StoreError>;

    async fn product_concrete_ids_by_abstract_ids(
        &self,
        abstract_ids: &[ProductAbstractId],
    ) -> Result<Vec<(ProductAbstractId, ProductConcreteId)>, StoreError>;

    async fn category_ids_by_product_abstract_ids(
        &self,
        abstract_ids: &[ProductAbstractId],
    ) -> Result<Vec<(ProductAbstractId, CategoryId)>, StoreError>;

    /// Insert (no id) or update (id) a list and reconcile its relation sets.
    ///
    /// Returns the persisted list with its reconciled relation sets. Updating
    /// an id that does not exist is `StoreError::MissingRecord`.
    async fn save_product_list(&self, write: ProductListWrite) -> Result<ProductList, StoreError>;

    /// Delete category relations, product relations, then the list row.
    ///
    /// Returns `false` when the list did not exist.
    async fn delete_product_list(&self, id: ProductListId) -> Result<bool, StoreError>;
}
