//! End-to-end tests through the facade over the in-memory store.
//!
//! Covers: list write round trips, failure responses that leave storage
//! untouched, restriction lookups, quote filtering, pagination, and the
//! constant number of store reads per batch lookup.

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use productlist_cart::{messages as cart_messages, CartChange, CartItem, Quote, RestrictionRule};
    use productlist_core::{CategoryId, Message, ProductAbstractId, ProductConcreteId, ProductListId};
    use productlist_lists::{
        messages, HookResult, HookStack, ProductList, ProductListCriteria, ProductListHooks, ProductListType,
    };

    use crate::facade::ProductListFacade;
    use crate::repository::PageLimits;
    use crate::store::InMemoryProductListStore;

    fn pa(id: i64) -> ProductAbstractId {
        ProductAbstractId::new(id)
    }

    fn pc(id: i64) -> ProductConcreteId {
        ProductConcreteId::new(id)
    }

    fn category(id: i64) -> CategoryId {
        CategoryId::new(id)
    }

    fn ids(v: &[ProductListId]) -> BTreeSet<ProductListId> {
        v.iter().copied().collect()
    }

    /// Catalog:
    /// - abstract 1 (variants 7, 8) in category 100
    /// - abstract 2 (variant 20) in category 200
    /// - abstract 3 (variant 30) uncategorized
    fn setup() -> (Arc<InMemoryProductListStore>, ProductListFacade<InMemoryProductListStore>) {
        setup_with_hooks(ProductListHooks::default())
    }

    fn setup_with_hooks(
        hooks: ProductListHooks,
    ) -> (Arc<InMemoryProductListStore>, ProductListFacade<InMemoryProductListStore>) {
        let store = Arc::new(InMemoryProductListStore::new());
        store.add_product(pa(1), pc(7)).unwrap();
        store.add_product(pa(1), pc(8)).unwrap();
        store.add_product(pa(2), pc(20)).unwrap();
        store.add_product(pa(3), pc(30)).unwrap();
        store.assign_category(pa(1), category(100)).unwrap();
        store.assign_category(pa(2), category(200)).unwrap();

        let facade = ProductListFacade::with_options(
            store.clone(),
            hooks,
            RestrictionRule::default(),
            PageLimits::default(),
        );
        (store, facade)
    }

    async fn create(facade: &ProductListFacade<InMemoryProductListStore>, list: ProductList) -> ProductListId {
        let response = facade.create_product_list(list).await.unwrap();
        assert!(response.is_successful, "create failed: {:?}", response.messages);
        response.product_list.id.unwrap()
    }

    fn item(sku: &str, abstract_id: i64, concrete_id: i64) -> CartItem {
        CartItem::new(sku, pa(abstract_id), pc(concrete_id), 1)
    }

    #[tokio::test]
    async fn saved_relations_round_trip() {
        let (_, facade) = setup();
        let list = ProductList::new("Seasonal", ProductListType::Whitelist)
            .with_categories([category(100), category(200)])
            .with_products([pc(7), pc(30)]);
        let id = create(&facade, list).await;

        assert_eq!(
            facade.category_ids_by_product_list_id(id).await.unwrap(),
            [category(100), category(200)].into_iter().collect()
        );

        let mut edited = facade.get_product_list_by_id(id).await.unwrap().unwrap();
        edited.category_ids = [category(200), category(300)].into_iter().collect();
        edited.product_concrete_ids.clear();
        let response = facade.update_product_list(edited).await.unwrap();
        assert!(response.is_successful);
        assert!(response.has_message(messages::UPDATED));

        let reloaded = facade.get_product_list_by_id(id).await.unwrap().unwrap();
        assert_eq!(reloaded.category_ids, [category(200), category(300)].into_iter().collect());
        assert!(reloaded.product_concrete_ids.is_empty());
        assert!(facade.product_concrete_ids_by_product_list_id(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_with_empty_title_does_not_mutate() {
        let (_, facade) = setup();
        let response = facade
            .create_product_list(ProductList::new("", ProductListType::Blacklist).with_products([pc(7)]))
            .await
            .unwrap();

        assert!(!response.is_successful);
        assert!(!response.messages.is_empty());
        let page = facade.get_product_list_collection(&ProductListCriteria::default()).await.unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn update_with_unknown_id_does_not_mutate() {
        let (store, facade) = setup();
        let ghost = ProductList::new("Ghost", ProductListType::Blacklist)
            .with_id(ProductListId::new(404))
            .with_categories([category(100)]);

        let response = facade.update_product_list(ghost).await.unwrap();
        assert!(!response.is_successful);
        assert!(response.has_message(messages::NOT_FOUND));
        assert_eq!(store.relation_rows(ProductListId::new(404)), 0);
    }

    #[tokio::test]
    async fn remove_leaves_no_orphaned_relations() {
        let (store, facade) = setup();
        let id = create(
            &facade,
            ProductList::new("A", ProductListType::Blacklist)
                .with_categories([category(100)])
                .with_products([pc(7), pc(8)]),
        )
        .await;
        let list = facade.get_product_list_by_id(id).await.unwrap().unwrap();

        let response = facade.remove_product_list(list.clone()).await.unwrap();
        assert!(response.is_successful);
        assert!(response.has_message(messages::REMOVED));
        assert_eq!(store.relation_rows(id), 0);
        assert!(facade.get_product_list_by_id(id).await.unwrap().is_none());

        let again = facade.remove_product_list(list).await.unwrap();
        assert!(!again.is_successful);
        assert!(again.has_message(messages::NOT_FOUND));
    }

    #[tokio::test]
    #[allow(deprecated)]
    async fn delete_twice_is_a_no_op_the_second_time() {
        let (_, facade) = setup();
        let id = create(&facade, ProductList::new("A", ProductListType::Blacklist)).await;
        let list = ProductList::new("A", ProductListType::Blacklist).with_id(id);

        facade.delete_product_list(list.clone()).await.unwrap();
        facade.delete_product_list(list).await.unwrap();
        assert!(facade.get_product_list_by_id(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_batch_yields_empty_map() {
        let (_, facade) = setup();
        assert!(facade.list_ids_by_product_concrete_ids(&[]).await.unwrap().is_empty());
        assert!(facade.list_ids_by_product_abstract_ids(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    #[allow(deprecated)]
    async fn blacklist_targets_only_the_listed_variant() {
        let (_, facade) = setup();
        let a = create(&facade, ProductList::new("A", ProductListType::Blacklist).with_products([pc(7)])).await;

        assert_eq!(facade.blacklist_ids_by_product_concrete_id(pc(7)).await.unwrap(), ids(&[a]));
        assert!(facade.blacklist_ids_by_product_concrete_id(pc(8)).await.unwrap().is_empty());

        // Deprecated aliases forward to the same lookups.
        assert_eq!(facade.product_abstract_blacklist_ids_by_product_concrete(pc(7)).await.unwrap(), ids(&[a]));
        assert_eq!(facade.product_abstract_blacklist_ids_by_product_abstract(pa(1)).await.unwrap(), ids(&[a]));
        assert!(facade.product_abstract_whitelist_ids_by_product_abstract(pa(1)).await.unwrap().is_empty());
        assert!(facade.product_abstract_whitelist_ids_by_product_concrete(pc(7)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn category_whitelist_strips_non_member_variant_from_quote() {
        let (_, facade) = setup();
        let b = create(
            &facade,
            ProductList::new("B", ProductListType::Whitelist).with_categories([category(100)]),
        )
        .await;
        assert_eq!(facade.category_whitelist_ids_by_product_abstract_id(pa(1)).await.unwrap(), ids(&[b]));
        assert_eq!(facade.whitelist_ids_by_product_abstract_id(pa(1)).await.unwrap(), ids(&[b]));

        let quote = Quote::new(vec![item("P-7", 1, 7), item("OTHER", 2, 20)]);
        let filtered = facade.filter_restricted_items(quote).await.unwrap();

        let skus: Vec<_> = filtered.items.iter().map(|i| i.sku.as_str()).collect();
        assert_eq!(skus, vec!["OTHER"]);
        assert_eq!(filtered.messages.len(), 1);
        assert_eq!(filtered.messages[0].value, cart_messages::ITEM_REMOVED);
        assert_eq!(filtered.messages[0].parameter("sku"), Some("P-7"));
    }

    #[tokio::test]
    async fn pre_check_rejects_each_restricted_item() {
        let (_, facade) = setup();
        create(&facade, ProductList::new("A", ProductListType::Blacklist).with_categories([category(200)])).await;

        let change = CartChange::new(
            Quote::default(),
            vec![item("OK", 3, 30), item("BLOCKED", 2, 20)],
        );
        let response = facade.validate_item_add_product_list_restrictions(&change).await.unwrap();

        assert!(!response.is_success);
        assert_eq!(response.messages.len(), 1);
        assert_eq!(response.messages[0].value, cart_messages::ITEM_RESTRICTED);
        assert_eq!(response.messages[0].parameter("reason"), Some("blacklisted"));
    }

    #[tokio::test]
    async fn pagination_is_stable() {
        let (_, facade) = setup();
        for n in 1..=5 {
            create(&facade, ProductList::new(format!("list-{n}"), ProductListType::Blacklist)).await;
        }

        let criteria = ProductListCriteria::paginated(2, 2);
        let first = facade.get_product_list_collection(&criteria).await.unwrap();
        let second = facade.get_product_list_collection(&criteria).await.unwrap();

        let page: Vec<_> = first.product_lists.iter().map(|l| l.id.unwrap().get()).collect();
        assert_eq!(page, vec![3, 4]);
        assert_eq!(first, second);
        assert_eq!(first.total, 5);
        assert!(first.has_more);
    }

    #[tokio::test]
    async fn batch_lookup_uses_constant_store_reads() {
        let (store, facade) = setup();
        create(&facade, ProductList::new("A", ProductListType::Blacklist).with_categories([category(100)])).await;

        store.reset_read_queries();
        facade.list_ids_by_product_concrete_ids(&[pc(7)]).await.unwrap();
        let single = store.read_queries();

        store.reset_read_queries();
        facade
            .list_ids_by_product_concrete_ids(&[pc(7), pc(8), pc(20), pc(30), pc(999)])
            .await
            .unwrap();
        assert_eq!(store.read_queries(), single);

        store.reset_read_queries();
        let quote = Quote::new((0..20).map(|n| item(&format!("SKU-{n}"), 3, 30)).collect());
        facade.filter_restricted_items(quote).await.unwrap();
        let many = store.read_queries();

        store.reset_read_queries();
        facade.filter_restricted_items(Quote::new(vec![item("ONE", 3, 30)])).await.unwrap();
        assert_eq!(store.read_queries(), many);
    }

    #[tokio::test]
    async fn hook_veto_keeps_storage_unchanged() {
        let hooks = ProductListHooks {
            pre_update: HookStack::new()
                .with(|_: ProductList| -> HookResult { Err(vec![Message::new("list.locked")]) }),
            ..Default::default()
        };
        let (_, facade) = setup_with_hooks(hooks);
        let id = create(&facade, ProductList::new("A", ProductListType::Blacklist)).await;

        let renamed = ProductList::new("B", ProductListType::Blacklist).with_id(id);
        let response = facade.update_product_list(renamed).await.unwrap();
        assert!(!response.is_successful);
        assert!(response.has_message("list.locked"));
        assert_eq!(facade.get_product_list_by_id(id).await.unwrap().unwrap().title, "A");
    }

    #[tokio::test]
    async fn type_cannot_change_after_creation() {
        let (_, facade) = setup();
        let id = create(&facade, ProductList::new("A", ProductListType::Blacklist)).await;

        let response = facade
            .update_product_list(ProductList::new("A", ProductListType::Whitelist).with_id(id))
            .await
            .unwrap();
        assert!(!response.is_successful);
        assert!(response.has_message(messages::TYPE_IMMUTABLE));
    }

    #[tokio::test]
    async fn list_products_resolve_to_abstract_ids() {
        let (_, facade) = setup();
        let a = create(&facade, ProductList::new("A", ProductListType::Blacklist).with_products([pc(7), pc(8)])).await;
        let b = create(&facade, ProductList::new("B", ProductListType::Whitelist).with_products([pc(20)])).await;

        assert_eq!(
            facade.product_abstract_ids_by_product_list_ids(&[a, b]).await.unwrap(),
            [pa(1), pa(2)].into_iter().collect()
        );
        assert_eq!(
            facade.product_concrete_ids_by_product_list_ids(&[a]).await.unwrap(),
            [pc(7), pc(8)].into_iter().collect()
        );
    }

    #[tokio::test]
    async fn responses_serialize_for_transport() {
        let (_, facade) = setup();
        let response = facade
            .create_product_list(ProductList::new("A", ProductListType::Whitelist))
            .await
            .unwrap();

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["product_list"]["type"], "whitelist");
        assert_eq!(json["is_successful"], true);
        assert_eq!(json["messages"][0]["value"], messages::CREATED);
    }
}
