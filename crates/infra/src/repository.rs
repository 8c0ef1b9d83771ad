//! Read side of product lists.
//!
//! Resolves a list id to its base record and relation sets, and pages through
//! lists. Lookups never fail for missing rows: unknown ids yield `None` or
//! empty sets.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, instrument};

use productlist_core::{CategoryId, ProductAbstractId, ProductConcreteId, ProductListId};
use productlist_lists::{
    Pagination, ProductList, ProductListCollection, ProductListCriteria,
    criteria::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE},
};

use crate::store::{ProductListStore, StoreError};

/// Page size limits applied to collection queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    /// Used when a caller requests a page with `limit == 0`.
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

impl PageLimits {
    pub fn apply(&self, pagination: Pagination) -> Pagination {
        let limit = if pagination.limit == 0 {
            self.default_page_size
        } else {
            pagination.limit
        };
        Pagination {
            limit,
            offset: pagination.offset,
        }
        .capped(self.max_page_size)
    }
}

pub struct ProductListRepository<S: ?Sized> {
    store: Arc<S>,
    limits: PageLimits,
}

impl<S: ?Sized> Clone for ProductListRepository<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            limits: self.limits,
        }
    }
}

impl<S: ProductListStore + ?Sized> ProductListRepository<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_limits(store, PageLimits::default())
    }

    pub fn with_limits(store: Arc<S>, limits: PageLimits) -> Self {
        Self { store, limits }
    }

    pub async fn related_category_ids(&self, id: ProductListId) -> Result<BTreeSet<CategoryId>, StoreError> {
        let rows = self.store.category_relations(&[id]).await?;
        Ok(rows.into_iter().map(|(_, c)| c).collect())
    }

    pub async fn related_product_concrete_ids(
        &self,
        id: ProductListId,
    ) -> Result<BTreeSet<ProductConcreteId>, StoreError> {
        let rows = self.store.product_concrete_relations(&[id]).await?;
        Ok(rows.into_iter().map(|(_, p)| p).collect())
    }

    /// Base record only; relation sets are left empty.
    pub async fn product_list_by_id(&self, id: ProductListId) -> Result<Option<ProductList>, StoreError> {
        self.store.find_product_list(id).await
    }

    /// Base record plus both relation sets.
    #[instrument(skip(self), fields(product_list_id = %id), err)]
    pub async fn hydrated_product_list_by_id(
        &self,
        id: ProductListId,
    ) -> Result<Option<ProductList>, StoreError> {
        let Some(list) = self.store.find_product_list(id).await? else {
            debug!("product list not found");
            return Ok(None);
        };
        let mut hydrated = self.hydrate(vec![list]).await?;
        Ok(hydrated.pop())
    }

    /// A page of hydrated lists ordered by id ascending.
    #[instrument(skip(self, criteria), err)]
    pub async fn find_product_lists(
        &self,
        criteria: &ProductListCriteria,
    ) -> Result<ProductListCollection, StoreError> {
        let pagination = criteria.pagination.map(|p| self.limits.apply(p));
        let (lists, total) = self.store.find_product_lists(pagination).await?;
        debug!(returned = lists.len(), total, "loaded product list page");

        let lists = self.hydrate(lists).await?;
        Ok(ProductListCollection::new(lists, total, pagination))
    }

    /// Concrete products directly targeted by any of the lists.
    pub async fn product_concrete_ids_by_list_ids(
        &self,
        list_ids: &[ProductListId],
    ) -> Result<BTreeSet<ProductConcreteId>, StoreError> {
        let rows = self.store.product_concrete_relations(list_ids).await?;
        Ok(rows.into_iter().map(|(_, p)| p).collect())
    }

    /// Abstract parents of the concrete products targeted by any of the lists.
    pub async fn product_abstract_ids_by_list_ids(
        &self,
        list_ids: &[ProductListId],
    ) -> Result<BTreeSet<ProductAbstractId>, StoreError> {
        let concrete_ids: Vec<_> = self
            .product_concrete_ids_by_list_ids(list_ids)
            .await?
            .into_iter()
            .collect();
        let rows = self
            .store
            .product_abstract_ids_by_concrete_ids(&concrete_ids)
            .await?;
        Ok(rows.into_iter().map(|(_, a)| a).collect())
    }

    /// Attach relation sets to base records with two batch reads.
    async fn hydrate(&self, lists: Vec<ProductList>) -> Result<Vec<ProductList>, StoreError> {
        let ids: Vec<ProductListId> = lists.iter().filter_map(|l| l.id).collect();

        let mut categories: BTreeMap<ProductListId, BTreeSet<CategoryId>> = BTreeMap::new();
        for (list_id, category_id) in self.store.category_relations(&ids).await? {
            categories.entry(list_id).or_default().insert(category_id);
        }
        let mut products: BTreeMap<ProductListId, BTreeSet<ProductConcreteId>> = BTreeMap::new();
        for (list_id, concrete_id) in self.store.product_concrete_relations(&ids).await? {
            products.entry(list_id).or_default().insert(concrete_id);
        }

        Ok(lists
            .into_iter()
            .map(|mut list| {
                if let Some(id) = list.id {
                    list.category_ids = categories.remove(&id).unwrap_or_default();
                    list.product_concrete_ids = products.remove(&id).unwrap_or_default();
                }
                list
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryProductListStore, ProductListWrite};
    use productlist_lists::ProductListType;

    async fn seed(store: &InMemoryProductListStore, n: usize) -> Vec<ProductListId> {
        let mut ids = Vec::new();
        for i in 0..n {
            let list = ProductList::new(format!("list-{}", i + 1), ProductListType::Blacklist)
                .with_categories([CategoryId::new(i as i64 + 1)]);
            let saved = store.save_product_list(ProductListWrite::from(&list)).await.unwrap();
            ids.push(saved.id.unwrap());
        }
        ids
    }

    #[tokio::test]
    async fn unknown_list_has_no_relations() {
        let repository = ProductListRepository::new(Arc::new(InMemoryProductListStore::new()));
        let id = ProductListId::new(42);

        assert!(repository.related_category_ids(id).await.unwrap().is_empty());
        assert!(repository.related_product_concrete_ids(id).await.unwrap().is_empty());
        assert!(repository.product_list_by_id(id).await.unwrap().is_none());
        assert!(repository.hydrated_product_list_by_id(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn base_record_is_not_hydrated() {
        let store = Arc::new(InMemoryProductListStore::new());
        let ids = seed(&store, 1).await;
        let repository = ProductListRepository::new(store);

        let base = repository.product_list_by_id(ids[0]).await.unwrap().unwrap();
        assert!(base.category_ids.is_empty());

        let hydrated = repository.hydrated_product_list_by_id(ids[0]).await.unwrap().unwrap();
        assert_eq!(hydrated.category_ids, [CategoryId::new(1)].into_iter().collect());
    }

    #[tokio::test]
    async fn page_is_ordered_capped_and_hydrated() {
        let store = Arc::new(InMemoryProductListStore::new());
        seed(&store, 5).await;
        let repository = ProductListRepository::with_limits(
            store,
            PageLimits {
                default_page_size: 2,
                max_page_size: 3,
            },
        );

        let page = repository
            .find_product_lists(&ProductListCriteria::paginated(10, 1))
            .await
            .unwrap();
        let titles: Vec<_> = page.product_lists.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["list-2", "list-3", "list-4"]);
        assert_eq!(page.total, 5);
        assert!(page.has_more);
        assert_eq!(page.product_lists[0].category_ids.len(), 1);

        let defaulted = repository
            .find_product_lists(&ProductListCriteria::paginated(0, 0))
            .await
            .unwrap();
        assert_eq!(defaulted.product_lists.len(), 2);

        let all = repository.find_product_lists(&ProductListCriteria::default()).await.unwrap();
        assert_eq!(all.product_lists.len(), 5);
        assert!(!all.has_more);
    }

    #[tokio::test]
    async fn abstract_ids_are_resolved_from_concrete_relations() {
        let store = Arc::new(InMemoryProductListStore::new());
        store.add_product(ProductAbstractId::new(1), ProductConcreteId::new(10)).unwrap();
        store.add_product(ProductAbstractId::new(1), ProductConcreteId::new(11)).unwrap();
        store.add_product(ProductAbstractId::new(2), ProductConcreteId::new(20)).unwrap();

        let list = ProductList::new("l", ProductListType::Whitelist)
            .with_products([ProductConcreteId::new(10), ProductConcreteId::new(11), ProductConcreteId::new(20)]);
        let id = store.save_product_list(ProductListWrite::from(&list)).await.unwrap().id.unwrap();
        let repository = ProductListRepository::new(store);

        let abstracts = repository.product_abstract_ids_by_list_ids(&[id]).await.unwrap();
        assert_eq!(abstracts, [ProductAbstractId::new(1), ProductAbstractId::new(2)].into_iter().collect());
        assert!(repository.product_abstract_ids_by_list_ids(&[]).await.unwrap().is_empty());
    }
}
