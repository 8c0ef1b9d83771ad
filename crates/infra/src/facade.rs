//! Public entry point for product lists.
//!
//! `ProductListFacade` composes the repository, restriction index, writer and
//! cart filter over one shared store. Each behavior has one canonical method;
//! older names remain as deprecated forwarding aliases.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use productlist_cart::{CartChange, CartPreCheckResponse, ProductRef, ProductRestrictions, Quote, RestrictionRule};
use productlist_core::{CategoryId, ProductAbstractId, ProductConcreteId, ProductListId};
use productlist_lists::{
    ProductList, ProductListCollection, ProductListCriteria, ProductListHooks, ProductListIdsByType,
    ProductListResponse,
};

use crate::cart_filter::CartRestrictionFilter;
use crate::manager::{ProductListError, ProductListWriter};
use crate::repository::{PageLimits, ProductListRepository};
use crate::restriction_index::RestrictionIndex;
use crate::store::{ProductListStore, StoreError};

pub struct ProductListFacade<S: ?Sized> {
    repository: ProductListRepository<S>,
    index: RestrictionIndex<S>,
    writer: ProductListWriter<S>,
    cart_filter: CartRestrictionFilter<S>,
}

impl<S: ?Sized> Clone for ProductListFacade<S> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
            index: self.index.clone(),
            writer: self.writer.clone(),
            cart_filter: self.cart_filter.clone(),
        }
    }
}

impl<S: ProductListStore + ?Sized> ProductListFacade<S> {
    /// Facade with no hooks, the default restriction rule and default page limits.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_options(store, ProductListHooks::default(), RestrictionRule::default(), PageLimits::default())
    }

    pub fn with_options(
        store: Arc<S>,
        hooks: ProductListHooks,
        rule: RestrictionRule,
        limits: PageLimits,
    ) -> Self {
        Self {
            repository: ProductListRepository::with_limits(Arc::clone(&store), limits),
            index: RestrictionIndex::new(Arc::clone(&store)),
            writer: ProductListWriter::new(Arc::clone(&store), hooks),
            cart_filter: CartRestrictionFilter::new(store, rule),
        }
    }

    // Writes

    pub async fn save_product_list(&self, list: ProductList) -> Result<ProductList, ProductListError> {
        self.writer.save(list).await
    }

    pub async fn create_product_list(&self, list: ProductList) -> Result<ProductListResponse, StoreError> {
        self.writer.create(list).await
    }

    pub async fn update_product_list(&self, list: ProductList) -> Result<ProductListResponse, StoreError> {
        self.writer.update(list).await
    }

    pub async fn remove_product_list(&self, list: ProductList) -> Result<ProductListResponse, StoreError> {
        self.writer.remove(list).await
    }

    #[deprecated(note = "use `remove_product_list`")]
    #[allow(deprecated)]
    pub async fn delete_product_list(&self, list: ProductList) -> Result<(), StoreError> {
        self.writer.delete(list).await
    }

    // Reads

    /// Base record with both relation sets.
    pub async fn get_product_list_by_id(&self, id: ProductListId) -> Result<Option<ProductList>, StoreError> {
        self.repository.hydrated_product_list_by_id(id).await
    }

    pub async fn get_product_list_collection(
        &self,
        criteria: &ProductListCriteria,
    ) -> Result<ProductListCollection, StoreError> {
        self.repository.find_product_lists(criteria).await
    }

    pub async fn category_ids_by_product_list_id(
        &self,
        id: ProductListId,
    ) -> Result<BTreeSet<CategoryId>, StoreError> {
        self.repository.related_category_ids(id).await
    }

    pub async fn product_concrete_ids_by_product_list_id(
        &self,
        id: ProductListId,
    ) -> Result<BTreeSet<ProductConcreteId>, StoreError> {
        self.repository.related_product_concrete_ids(id).await
    }

    pub async fn product_abstract_ids_by_product_list_ids(
        &self,
        ids: &[ProductListId],
    ) -> Result<BTreeSet<ProductAbstractId>, StoreError> {
        self.repository.product_abstract_ids_by_list_ids(ids).await
    }

    pub async fn product_concrete_ids_by_product_list_ids(
        &self,
        ids: &[ProductListId],
    ) -> Result<BTreeSet<ProductConcreteId>, StoreError> {
        self.repository.product_concrete_ids_by_list_ids(ids).await
    }

    // Restriction index

    pub async fn blacklist_ids_by_product_abstract_id(
        &self,
        id: ProductAbstractId,
    ) -> Result<BTreeSet<ProductListId>, StoreError> {
        self.index.blacklist_ids_for_abstract_product(id).await
    }

    pub async fn whitelist_ids_by_product_abstract_id(
        &self,
        id: ProductAbstractId,
    ) -> Result<BTreeSet<ProductListId>, StoreError> {
        self.index.whitelist_ids_for_abstract_product(id).await
    }

    pub async fn blacklist_ids_by_product_concrete_id(
        &self,
        id: ProductConcreteId,
    ) -> Result<BTreeSet<ProductListId>, StoreError> {
        self.index.blacklist_ids_for_concrete_product(id).await
    }

    pub async fn whitelist_ids_by_product_concrete_id(
        &self,
        id: ProductConcreteId,
    ) -> Result<BTreeSet<ProductListId>, StoreError> {
        self.index.whitelist_ids_for_concrete_product(id).await
    }

    pub async fn category_whitelist_ids_by_product_abstract_id(
        &self,
        id: ProductAbstractId,
    ) -> Result<BTreeSet<ProductListId>, StoreError> {
        self.index.category_whitelist_ids_for_abstract_product(id).await
    }

    pub async fn list_ids_by_product_concrete_ids(
        &self,
        ids: &[ProductConcreteId],
    ) -> Result<HashMap<ProductConcreteId, ProductListIdsByType>, StoreError> {
        self.index.list_ids_by_product_concrete_ids(ids).await
    }

    pub async fn list_ids_by_product_abstract_ids(
        &self,
        ids: &[ProductAbstractId],
    ) -> Result<HashMap<ProductAbstractId, ProductListIdsByType>, StoreError> {
        self.index.list_ids_by_product_abstract_ids(ids).await
    }

    pub async fn restrictions_for_products(
        &self,
        refs: &[ProductRef],
    ) -> Result<HashMap<ProductConcreteId, ProductRestrictions>, StoreError> {
        self.index.restrictions_for_products(refs).await
    }

    #[deprecated(note = "use `blacklist_ids_by_product_abstract_id`")]
    pub async fn product_abstract_blacklist_ids_by_product_abstract(
        &self,
        id: ProductAbstractId,
    ) -> Result<BTreeSet<ProductListId>, StoreError> {
        self.blacklist_ids_by_product_abstract_id(id).await
    }

    #[deprecated(note = "use `whitelist_ids_by_product_abstract_id`")]
    pub async fn product_abstract_whitelist_ids_by_product_abstract(
        &self,
        id: ProductAbstractId,
    ) -> Result<BTreeSet<ProductListId>, StoreError> {
        self.whitelist_ids_by_product_abstract_id(id).await
    }

    #[deprecated(note = "use `blacklist_ids_by_product_concrete_id`")]
    pub async fn product_abstract_blacklist_ids_by_product_concrete(
        &self,
        id: ProductConcreteId,
    ) -> Result<BTreeSet<ProductListId>, StoreError> {
        self.blacklist_ids_by_product_concrete_id(id).await
    }

    #[deprecated(note = "use `whitelist_ids_by_product_concrete_id`")]
    pub async fn product_abstract_whitelist_ids_by_product_concrete(
        &self,
        id: ProductConcreteId,
    ) -> Result<BTreeSet<ProductListId>, StoreError> {
        self.whitelist_ids_by_product_concrete_id(id).await
    }

    // Cart

    pub async fn validate_item_add_product_list_restrictions(
        &self,
        change: &CartChange,
    ) -> Result<CartPreCheckResponse, StoreError> {
        self.cart_filter.check_cart_change(change).await
    }

    pub async fn filter_restricted_items(&self, quote: Quote) -> Result<Quote, StoreError> {
        self.cart_filter.filter_restricted_items(quote).await
    }
}
