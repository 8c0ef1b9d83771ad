//! Applying the restriction rule to cart changes and quotes.
//!
//! These functions take precomputed restrictions keyed by concrete product id.
//! A product missing from the map has no restriction data and passes.

use std::collections::HashMap;

use productlist_core::{Message, ProductConcreteId};

use crate::cart::{CartItem, CartPreCheckResponse, Quote};
use crate::rule::{ProductRestrictions, RestrictionReason, RestrictionRule};

/// Translation keys for restriction outcomes.
pub mod messages {
    pub const ITEM_RESTRICTED: &str = "product_list.cart.item_restricted";
    pub const ITEM_REMOVED: &str = "product_list.quote.item_removed";
}

fn reason_for(
    item: &CartItem,
    restrictions: &HashMap<ProductConcreteId, ProductRestrictions>,
    rule: &RestrictionRule,
) -> Option<RestrictionReason> {
    restrictions
        .get(&item.product_concrete_id)
        .and_then(|r| rule.evaluate(r))
}

/// Pre-check for items about to be added. One message per rejected item.
pub fn check_items(
    items: &[CartItem],
    restrictions: &HashMap<ProductConcreteId, ProductRestrictions>,
    rule: &RestrictionRule,
) -> CartPreCheckResponse {
    let messages = items
        .iter()
        .filter_map(|item| {
            reason_for(item, restrictions, rule).map(|reason| {
                Message::new(messages::ITEM_RESTRICTED)
                    .with_parameter("sku", &item.sku)
                    .with_parameter("reason", reason.as_str())
            })
        })
        .collect();

    CartPreCheckResponse::from_messages(messages)
}

/// Remove restricted items from a quote, appending one message per removed item.
///
/// Returns the filtered quote together with the removed items.
pub fn strip_restricted(
    mut quote: Quote,
    restrictions: &HashMap<ProductConcreteId, ProductRestrictions>,
    rule: &RestrictionRule,
) -> (Quote, Vec<CartItem>) {
    let mut kept = Vec::with_capacity(quote.items.len());
    let mut removed = Vec::new();

    for item in quote.items.drain(..) {
        match reason_for(&item, restrictions, rule) {
            Some(reason) => {
                quote.messages.push(
                    Message::new(messages::ITEM_REMOVED)
                        .with_parameter("sku", &item.sku)
                        .with_parameter("reason", reason.as_str()),
                );
                removed.push(item);
            }
            None => kept.push(item),
        }
    }

    quote.items = kept;
    (quote, removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use productlist_core::{ProductAbstractId, ProductListId};

    fn item(sku: &str, abstract_id: i64, concrete_id: i64) -> CartItem {
        CartItem::new(
            sku,
            ProductAbstractId::new(abstract_id),
            ProductConcreteId::new(concrete_id),
            1,
        )
    }

    fn blacklisted() -> ProductRestrictions {
        ProductRestrictions {
            blacklist_ids: [ProductListId::new(1)].into_iter().collect(),
            ..Default::default()
        }
    }

    #[test]
    fn check_passes_when_nothing_is_restricted() {
        let items = vec![item("A", 1, 10), item("B", 2, 20)];
        let response = check_items(&items, &HashMap::new(), &RestrictionRule::default());
        assert!(response.is_success);
        assert!(response.messages.is_empty());
    }

    #[test]
    fn check_reports_each_rejected_item() {
        let items = vec![item("A", 1, 10), item("B", 2, 20), item("C", 3, 30)];
        let restrictions = HashMap::from([
            (ProductConcreteId::new(10), blacklisted()),
            (ProductConcreteId::new(30), blacklisted()),
        ]);

        let response = check_items(&items, &restrictions, &RestrictionRule::default());
        assert!(!response.is_success);
        let skus: Vec<_> = response.messages.iter().filter_map(|m| m.parameter("sku")).collect();
        assert_eq!(skus, vec!["A", "C"]);
        assert!(response.messages.iter().all(|m| m.value == messages::ITEM_RESTRICTED));
    }

    #[test]
    fn strip_removes_restricted_items_and_keeps_order() {
        let mut quote = Quote::new(vec![item("A", 1, 10), item("B", 2, 20), item("C", 3, 30)]);
        quote.messages.push(Message::new("existing"));
        let restrictions = HashMap::from([(ProductConcreteId::new(20), blacklisted())]);

        let (quote, removed) = strip_restricted(quote, &restrictions, &RestrictionRule::default());

        let skus: Vec<_> = quote.items.iter().map(|i| i.sku.as_str()).collect();
        assert_eq!(skus, vec!["A", "C"]);
        assert_eq!(removed.len(), 1);
        assert_eq!(quote.messages.len(), 2);
        assert_eq!(quote.messages[1].value, messages::ITEM_REMOVED);
        assert_eq!(quote.messages[1].parameter("sku"), Some("B"));
        assert_eq!(quote.messages[1].parameter("reason"), Some("blacklisted"));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn strip_partitions_items(
                concrete_ids in proptest::collection::vec(1i64..20, 0..16),
                blacklisted_ids in proptest::collection::btree_set(1i64..20, 0..8),
            ) {
                let items: Vec<CartItem> = concrete_ids
                    .iter()
                    .map(|id| item(&format!("SKU-{id}"), *id, *id))
                    .collect();
                let restrictions: HashMap<_, _> = blacklisted_ids
                    .iter()
                    .map(|id| (ProductConcreteId::new(*id), blacklisted()))
                    .collect();

                let (quote, removed) = strip_restricted(
                    Quote::new(items.clone()),
                    &restrictions,
                    &RestrictionRule::default(),
                );

                prop_assert_eq!(quote.items.len() + removed.len(), items.len());
                prop_assert_eq!(quote.messages.len(), removed.len());
                for kept in &quote.items {
                    prop_assert!(!blacklisted_ids.contains(&kept.product_concrete_id.get()));
                }
            }
        }
    }
}
