//! Which lists apply to which products.
//!
//! A list reaches a product two ways:
//!
//! - directly, by targeting one of its concrete variants
//! - through a category the abstract product belongs to
//!
//! For a concrete product, category-scoped lists of its abstract parent apply,
//! plus lists targeting that concrete id. Lists targeting only a sibling
//! variant do not apply.
//!
//! For an abstract product, lists targeting any of its concrete variants apply,
//! plus its category-scoped lists.
//!
//! Every batch lookup issues a fixed number of store reads regardless of input
//! size. Each input id appears in the output, with empty sets when no list
//! applies.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::{debug, instrument};

use productlist_cart::{ProductRef, ProductRestrictions};
use productlist_core::{CategoryId, ProductAbstractId, ProductConcreteId, ProductListId};
use productlist_lists::{ProductListIdsByType, ProductListType};

use crate::store::{ListRelation, ProductListStore, StoreError};

pub struct RestrictionIndex<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for RestrictionIndex<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: ProductListStore + ?Sized> RestrictionIndex<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn blacklist_ids_for_abstract_product(
        &self,
        id: ProductAbstractId,
    ) -> Result<BTreeSet<ProductListId>, StoreError> {
        self.abstract_ids_of_type(id, ProductListType::Blacklist).await
    }

    pub async fn whitelist_ids_for_abstract_product(
        &self,
        id: ProductAbstractId,
    ) -> Result<BTreeSet<ProductListId>, StoreError> {
        self.abstract_ids_of_type(id, ProductListType::Whitelist).await
    }

    pub async fn blacklist_ids_for_concrete_product(
        &self,
        id: ProductConcreteId,
    ) -> Result<BTreeSet<ProductListId>, StoreError> {
        self.concrete_ids_of_type(id, ProductListType::Blacklist).await
    }

    pub async fn whitelist_ids_for_concrete_product(
        &self,
        id: ProductConcreteId,
    ) -> Result<BTreeSet<ProductListId>, StoreError> {
        self.concrete_ids_of_type(id, ProductListType::Whitelist).await
    }

    /// Whitelists reaching the abstract product through its categories only.
    pub async fn category_whitelist_ids_for_abstract_product(
        &self,
        id: ProductAbstractId,
    ) -> Result<BTreeSet<ProductListId>, StoreError> {
        let categories = self.store.category_ids_by_product_abstract_ids(&[id]).await?;
        let category_ids: Vec<CategoryId> = categories.into_iter().map(|(_, c)| c).collect();

        Ok(self
            .store
            .list_relations_by_category_ids(&category_ids)
            .await?
            .into_iter()
            .filter(|r| r.list_type == ProductListType::Whitelist)
            .map(|r| r.product_list_id)
            .collect())
    }

    /// Batch lookup keyed by concrete id.
    #[instrument(skip(self, ids), fields(batch = ids.len()), err)]
    pub async fn list_ids_by_product_concrete_ids(
        &self,
        ids: &[ProductConcreteId],
    ) -> Result<HashMap<ProductConcreteId, ProductListIdsByType>, StoreError> {
        let concrete_ids = dedup(ids);
        if concrete_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let parents: HashMap<ProductConcreteId, ProductAbstractId> = self
            .store
            .product_abstract_ids_by_concrete_ids(&concrete_ids)
            .await?
            .into_iter()
            .collect();
        let abstract_ids = dedup(&parents.values().copied().collect::<Vec<_>>());

        let by_abstract = self.category_lists_by_abstract(&abstract_ids).await?;
        let direct = group(
            self.store
                .list_relations_by_product_concrete_ids(&concrete_ids)
                .await?,
        );

        let result: HashMap<_, _> = concrete_ids
            .into_iter()
            .map(|concrete_id| {
                let mut ids = direct.get(&concrete_id).cloned().unwrap_or_default();
                if let Some(from_categories) = parents
                    .get(&concrete_id)
                    .and_then(|parent| by_abstract.get(parent))
                {
                    ids.merge(from_categories);
                }
                (concrete_id, ids)
            })
            .collect();

        debug!(restricted = result.values().filter(|v| !v.is_empty()).count(), "resolved list ids");
        Ok(result)
    }

    /// Batch lookup keyed by abstract id.
    #[instrument(skip(self, ids), fields(batch = ids.len()), err)]
    pub async fn list_ids_by_product_abstract_ids(
        &self,
        ids: &[ProductAbstractId],
    ) -> Result<HashMap<ProductAbstractId, ProductListIdsByType>, StoreError> {
        let abstract_ids = dedup(ids);
        if abstract_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let variants = self
            .store
            .product_concrete_ids_by_abstract_ids(&abstract_ids)
            .await?;
        let concrete_ids = dedup(&variants.iter().map(|(_, c)| *c).collect::<Vec<_>>());
        let direct = group(
            self.store
                .list_relations_by_product_concrete_ids(&concrete_ids)
                .await?,
        );

        let mut result = self.category_lists_by_abstract(&abstract_ids).await?;
        for abstract_id in &abstract_ids {
            result.entry(*abstract_id).or_default();
        }
        for (abstract_id, concrete_id) in variants {
            if let (Some(entry), Some(ids)) = (result.get_mut(&abstract_id), direct.get(&concrete_id)) {
                entry.merge(ids);
            }
        }
        Ok(result)
    }

    /// Classification of each product for the cart restriction rule.
    ///
    /// The abstract id on each ref is taken as given; no parent lookup is made.
    #[instrument(skip(self, refs), fields(batch = refs.len()), err)]
    pub async fn restrictions_for_products(
        &self,
        refs: &[ProductRef],
    ) -> Result<HashMap<ProductConcreteId, ProductRestrictions>, StoreError> {
        if refs.is_empty() {
            return Ok(HashMap::new());
        }
        let abstract_ids = dedup(&refs.iter().map(|r| r.product_abstract_id).collect::<Vec<_>>());
        let concrete_ids = dedup(&refs.iter().map(|r| r.product_concrete_id).collect::<Vec<_>>());

        let by_abstract = self.category_lists_by_abstract(&abstract_ids).await?;
        let direct = group(
            self.store
                .list_relations_by_product_concrete_ids(&concrete_ids)
                .await?,
        );

        let mut result: HashMap<ProductConcreteId, ProductRestrictions> = HashMap::new();
        for r in refs {
            let entry = result.entry(r.product_concrete_id).or_default();
            if let Some(ids) = by_abstract.get(&r.product_abstract_id) {
                entry.blacklist_ids.extend(ids.blacklist.iter().copied());
                entry.category_whitelist_ids.extend(ids.whitelist.iter().copied());
            }
            if let Some(ids) = direct.get(&r.product_concrete_id) {
                entry.blacklist_ids.extend(ids.blacklist.iter().copied());
                entry.product_whitelist_ids.extend(ids.whitelist.iter().copied());
            }
        }
        Ok(result)
    }

    /// Category-scoped lists per abstract product (two store reads).
    async fn category_lists_by_abstract(
        &self,
        abstract_ids: &[ProductAbstractId],
    ) -> Result<HashMap<ProductAbstractId, ProductListIdsByType>, StoreError> {
        let memberships = self
            .store
            .category_ids_by_product_abstract_ids(abstract_ids)
            .await?;
        let category_ids = dedup(&memberships.iter().map(|(_, c)| *c).collect::<Vec<_>>());
        let by_category = group(self.store.list_relations_by_category_ids(&category_ids).await?);

        let mut result: HashMap<ProductAbstractId, ProductListIdsByType> = HashMap::new();
        for (abstract_id, category_id) in memberships {
            if let Some(ids) = by_category.get(&category_id) {
                result.entry(abstract_id).or_default().merge(ids);
            }
        }
        Ok(result)
    }

    async fn abstract_ids_of_type(
        &self,
        id: ProductAbstractId,
        list_type: ProductListType,
    ) -> Result<BTreeSet<ProductListId>, StoreError> {
        let mut found = self.list_ids_by_product_abstract_ids(&[id]).await?;
        Ok(found
            .remove(&id)
            .map(|ids| ids.ids(list_type).clone())
            .unwrap_or_default())
    }

    async fn concrete_ids_of_type(
        &self,
        id: ProductConcreteId,
        list_type: ProductListType,
    ) -> Result<BTreeSet<ProductListId>, StoreError> {
        let mut found = self.list_ids_by_product_concrete_ids(&[id]).await?;
        Ok(found
            .remove(&id)
            .map(|ids| ids.ids(list_type).clone())
            .unwrap_or_default())
    }
}

fn dedup<T: Ord + Copy>(ids: &[T]) -> Vec<T> {
    ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect()
}

fn group<T: std::hash::Hash + Eq>(relations: Vec<ListRelation<T>>) -> HashMap<T, ProductListIdsByType> {
    let mut grouped: HashMap<T, ProductListIdsByType> = HashMap::new();
    for relation in relations {
        grouped
            .entry(relation.target)
            .or_default()
            .insert(relation.list_type, relation.product_list_id);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryProductListStore, ProductListWrite};
    use productlist_lists::ProductList;

    fn pa(id: i64) -> ProductAbstractId {
        ProductAbstractId::new(id)
    }

    fn pc(id: i64) -> ProductConcreteId {
        ProductConcreteId::new(id)
    }

    fn ids(v: &[i64]) -> BTreeSet<ProductListId> {
        v.iter().copied().map(ProductListId::new).collect()
    }

    async fn save(store: &InMemoryProductListStore, list: ProductList) -> ProductListId {
        store
            .save_product_list(ProductListWrite::from(&list))
            .await
            .unwrap()
            .id
            .unwrap()
    }

    /// Abstract 1 (variants 10, 11) in category 100; abstract 2 (variant 20) uncategorized.
    fn catalog() -> Arc<InMemoryProductListStore> {
        let store = Arc::new(InMemoryProductListStore::new());
        store.add_product(pa(1), pc(10)).unwrap();
        store.add_product(pa(1), pc(11)).unwrap();
        store.add_product(pa(2), pc(20)).unwrap();
        store.assign_category(pa(1), CategoryId::new(100)).unwrap();
        store
    }

    #[tokio::test]
    async fn direct_blacklist_applies_only_to_its_concrete() {
        let store = catalog();
        let a = save(&store, ProductList::new("A", ProductListType::Blacklist).with_products([pc(10)])).await;
        let index = RestrictionIndex::new(store);

        assert_eq!(index.blacklist_ids_for_concrete_product(pc(10)).await.unwrap(), ids(&[a.get()]));
        assert!(index.blacklist_ids_for_concrete_product(pc(11)).await.unwrap().is_empty());
        assert_eq!(index.blacklist_ids_for_abstract_product(pa(1)).await.unwrap(), ids(&[a.get()]));
        assert!(index.whitelist_ids_for_abstract_product(pa(1)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn category_lists_reach_every_variant() {
        let store = catalog();
        let w = save(
            &store,
            ProductList::new("W", ProductListType::Whitelist).with_categories([CategoryId::new(100)]),
        )
        .await;
        let index = RestrictionIndex::new(store);

        for concrete in [pc(10), pc(11)] {
            assert_eq!(index.whitelist_ids_for_concrete_product(concrete).await.unwrap(), ids(&[w.get()]));
        }
        assert_eq!(
            index.category_whitelist_ids_for_abstract_product(pa(1)).await.unwrap(),
            ids(&[w.get()])
        );
        assert!(index.whitelist_ids_for_concrete_product(pc(20)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn batch_output_contains_every_input() {
        let store = catalog();
        save(&store, ProductList::new("A", ProductListType::Blacklist).with_products([pc(20)])).await;
        let index = RestrictionIndex::new(store);

        let by_concrete = index
            .list_ids_by_product_concrete_ids(&[pc(10), pc(20), pc(999)])
            .await
            .unwrap();
        assert_eq!(by_concrete.len(), 3);
        assert!(by_concrete[&pc(10)].is_empty());
        assert!(!by_concrete[&pc(20)].blacklist.is_empty());
        assert!(by_concrete[&pc(999)].is_empty());

        let by_abstract = index.list_ids_by_product_abstract_ids(&[pa(1), pa(2)]).await.unwrap();
        assert_eq!(by_abstract.len(), 2);
        assert!(by_abstract[&pa(1)].is_empty());
        assert!(!by_abstract[&pa(2)].blacklist.is_empty());
    }

    #[tokio::test]
    async fn empty_batches_do_not_touch_storage() {
        let store = catalog();
        let index = RestrictionIndex::new(store.clone());

        assert!(index.list_ids_by_product_concrete_ids(&[]).await.unwrap().is_empty());
        assert!(index.list_ids_by_product_abstract_ids(&[]).await.unwrap().is_empty());
        assert!(index.restrictions_for_products(&[]).await.unwrap().is_empty());
        assert_eq!(store.read_queries(), 0);
    }

    #[tokio::test]
    async fn restrictions_split_category_and_direct_whitelists() {
        let store = catalog();
        let by_category = save(
            &store,
            ProductList::new("cat", ProductListType::Whitelist).with_categories([CategoryId::new(100)]),
        )
        .await;
        let direct = save(&store, ProductList::new("direct", ProductListType::Whitelist).with_products([pc(11)])).await;
        let index = RestrictionIndex::new(store);

        let restrictions = index
            .restrictions_for_products(&[ProductRef::new(pa(1), pc(10)), ProductRef::new(pa(1), pc(11))])
            .await
            .unwrap();

        assert_eq!(restrictions[&pc(10)].category_whitelist_ids, ids(&[by_category.get()]));
        assert!(restrictions[&pc(10)].product_whitelist_ids.is_empty());
        assert_eq!(restrictions[&pc(11)].product_whitelist_ids, ids(&[direct.get()]));
    }
}
