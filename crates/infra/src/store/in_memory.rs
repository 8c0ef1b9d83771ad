use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

use productlist_core::{CategoryId, ProductAbstractId, ProductConcreteId, ProductListId};
use productlist_lists::{Pagination, ProductList, RelationDiff};

use super::r#trait::{ListRelation, ProductListStore, ProductListWrite, StoreError};

#[derive(Debug, Default)]
struct State {
    lists: BTreeMap<ProductListId, ProductList>,
    list_categories: BTreeSet<(ProductListId, CategoryId)>,
    list_products: BTreeSet<(ProductListId, ProductConcreteId)>,
    concrete_parents: BTreeMap<ProductConcreteId, ProductAbstractId>,
    abstract_categories: BTreeSet<(ProductAbstractId, CategoryId)>,
    last_list_id: i64,
}

impl State {
    fn categories_of(&self, id: ProductListId) -> BTreeSet<CategoryId> {
        self.list_categories
            .iter()
            .filter(|(l, _)| *l == id)
            .map(|(_, c)| *c)
            .collect()
    }

    fn products_of(&self, id: ProductListId) -> BTreeSet<ProductConcreteId> {
        self.list_products
            .iter()
            .filter(|(l, _)| *l == id)
            .map(|(_, p)| *p)
            .collect()
    }

    fn relation<T>(&self, id: ProductListId, target: T) -> Option<ListRelation<T>> {
        self.lists.get(&id).map(|list| ListRelation {
            product_list_id: id,
            list_type: list.list_type,
            target,
        })
    }
}

/// In-memory product list store.
///
/// Intended for tests/dev. Each write runs under a single write guard, which
/// gives the same all-or-nothing visibility a database transaction does.
/// Catalog relations are seeded through [`add_product`](Self::add_product)
/// and [`assign_category`](Self::assign_category).
#[derive(Debug, Default)]
pub struct InMemoryProductListStore {
    state: RwLock<State>,
    read_queries: AtomicU64,
}

impl InMemoryProductListStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a concrete variant of an abstract product.
    pub fn add_product(
        &self,
        abstract_id: ProductAbstractId,
        concrete_id: ProductConcreteId,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::Poisoned)?;
        state.concrete_parents.insert(concrete_id, abstract_id);
        Ok(())
    }

    /// Put an abstract product into a category.
    pub fn assign_category(
        &self,
        abstract_id: ProductAbstractId,
        category_id: CategoryId,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::Poisoned)?;
        state.abstract_categories.insert((abstract_id, category_id));
        Ok(())
    }

    /// Number of read queries served so far.
    pub fn read_queries(&self) -> u64 {
        self.read_queries.load(Ordering::SeqCst)
    }

    pub fn reset_read_queries(&self) {
        self.read_queries.store(0, Ordering::SeqCst);
    }

    /// Relation rows (categories + products) still pointing at `id`.
    pub fn relation_rows(&self, id: ProductListId) -> usize {
        self.state
            .read()
            .map(|s| s.categories_of(id).len() + s.products_of(id).len())
            .unwrap_or(0)
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, State>, StoreError> {
        self.read_queries.fetch_add(1, Ordering::SeqCst);
        self.state.read().map_err(|_| StoreError::Poisoned)
    }
}

#[async_trait::async_trait]
impl ProductListStore for InMemoryProductListStore {
    async fn find_product_list(&self, id: ProductListId) -> Result<Option<ProductList>, StoreError> {
        let state = self.read()?;
        Ok(state.lists.get(&id).cloned())
    }

    async fn find_product_lists(
        &self,
        pagination: Option<Pagination>,
    ) -> Result<(Vec<ProductList>, u64), StoreError> {
        let state = self.read()?;
        let total = state.lists.len() as u64;
        let rows = state.lists.values();
        let page = match pagination {
            Some(p) => rows
                .skip(p.offset as usize)
                .take(p.limit as usize)
                .cloned()
                .collect(),
            None => rows.cloned().collect(),
        };
        Ok((page, total))
    }

    async fn category_relations(
        &self,
        list_ids: &[ProductListId],
    ) -> Result<Vec<(ProductListId, CategoryId)>, StoreError> {
        if list_ids.is_empty() {
            return Ok(vec![]);
        }
        let state = self.read()?;
        Ok(state
            .list_categories
            .iter()
            .filter(|(l, _)| list_ids.contains(l))
            .copied()
            .collect())
    }

    async fn product_concrete_relations(
        &self,
        list_ids: &[ProductListId],
    ) -> Result<Vec<(ProductListId, ProductConcreteId)>, StoreError> {
        if list_ids.is_empty() {
            return Ok(vec![]);
        }
        let state = self.read()?;
        Ok(state
            .list_products
            .iter()
            .filter(|(l, _)| list_ids.contains(l))
            .copied()
            .collect())
    }

    async fn list_relations_by_category_ids(
        &self,
        category_ids: &[CategoryId],
    ) -> Result<Vec<ListRelation<CategoryId>>, StoreError> {
        if category_ids.is_empty() {
            return Ok(vec![]);
        }
        let state = self.read()?;
        Ok(state
            .list_categories
            .iter()
            .filter(|(_, c)| category_ids.contains(c))
            .filter_map(|(l, c)| state.relation(*l, *c))
            .collect())
    }

    async fn list_relations_by_product_concrete_ids(
        &self,
        concrete_ids: &[ProductConcreteId],
    ) -> Result<Vec<ListRelation<ProductConcreteId>>, StoreError> {
        if concrete_ids.is_empty() {
            return Ok(vec![]);
        }
        let state = self.read()?;
        Ok(state
            .list_products
            .iter()
            .filter(|(_, p)| concrete_ids.contains(p))
            .filter_map(|(l, p)| state.relation(*l, *p))
            .collect())
    }

    async fn product_abstract_ids_by_concrete_ids(
        &self,
        concrete_ids: &[ProductConcreteId],
    ) -> Result<Vec<(ProductConcreteId, ProductAbstractId)>, StoreError> {
        if concrete_ids.is_empty() {
            return Ok(vec![]);
        }
        let state = self.read()?;
        Ok(concrete_ids
            .iter()
            .filter_map(|c| state.concrete_parents.get(c).map(|a| (*c, *a)))
            .collect())
    }

    async fn product_concrete_ids_by_abstract_ids(
        &self,
        abstract_ids: &[ProductAbstractId],
    ) -> Result<Vec<(ProductAbstractId, ProductConcreteId)>, StoreError> {
        if abstract_ids.is_empty() {
            return Ok(vec![]);
        }
        let state = self.read()?;
        Ok(state
            .concrete_parents
            .iter()
            .filter(|(_, a)| abstract_ids.contains(a))
            .map(|(c, a)| (*a, *c))
            .collect())
    }

    async fn category_ids_by_product_abstract_ids(
        &self,
        abstract_ids: &[ProductAbstractId],
    ) -> Result<Vec<(ProductAbstractId, CategoryId)>, StoreError> {
        if abstract_ids.is_empty() {
            return Ok(vec![]);
        }
        let state = self.read()?;
        Ok(state
            .abstract_categories
            .iter()
            .filter(|(a, _)| abstract_ids.contains(a))
            .copied()
            .collect())
    }

    async fn save_product_list(&self, write: ProductListWrite) -> Result<ProductList, StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::Poisoned)?;
        let now = Utc::now();

        let base = match write.id {
            Some(id) => {
                let existing = state.lists.get_mut(&id).ok_or(StoreError::MissingRecord(id))?;
                existing.title = write.title.clone();
                existing.list_type = write.list_type;
                existing.updated_at = Some(now);
                existing.clone()
            }
            None => {
                state.last_list_id += 1;
                let id = ProductListId::new(state.last_list_id);
                let mut row = ProductList::new(write.title.clone(), write.list_type).with_id(id);
                row.created_at = Some(now);
                row.updated_at = Some(now);
                state.lists.insert(id, row.clone());
                row
            }
        };
        let Some(id) = base.id else {
            return Err(StoreError::CorruptRow("saved list row has no id".to_string()));
        };

        let categories = RelationDiff::between(&state.categories_of(id), &write.category_ids);
        for c in &categories.to_remove {
            state.list_categories.remove(&(id, *c));
        }
        for c in &categories.to_add {
            state.list_categories.insert((id, *c));
        }

        let products = RelationDiff::between(&state.products_of(id), &write.product_concrete_ids);
        for p in &products.to_remove {
            state.list_products.remove(&(id, *p));
        }
        for p in &products.to_add {
            state.list_products.insert((id, *p));
        }

        Ok(ProductList {
            category_ids: write.category_ids,
            product_concrete_ids: write.product_concrete_ids,
            ..base
        })
    }

    async fn delete_product_list(&self, id: ProductListId) -> Result<bool, StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::Poisoned)?;
        if !state.lists.contains_key(&id) {
            return Ok(false);
        }

        // Children before parent.
        state.list_categories.retain(|(l, _)| *l != id);
        state.list_products.retain(|(l, _)| *l != id);
        state.lists.remove(&id);
        Ok(true)
    }
}
