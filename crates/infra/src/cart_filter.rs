//! Enforces product list restrictions on carts and quotes.
//!
//! One restriction index call per operation, covering every item.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use productlist_cart::{
    check_items, strip_restricted, CartChange, CartPreCheckResponse, Quote, RestrictionRule,
};

use crate::restriction_index::RestrictionIndex;
use crate::store::{ProductListStore, StoreError};

pub struct CartRestrictionFilter<S: ?Sized> {
    index: RestrictionIndex<S>,
    rule: RestrictionRule,
}

impl<S: ?Sized> Clone for CartRestrictionFilter<S> {
    fn clone(&self) -> Self {
        Self {
            index: self.index.clone(),
            rule: self.rule,
        }
    }
}

impl<S: ProductListStore + ?Sized> CartRestrictionFilter<S> {
    pub fn new(store: Arc<S>, rule: RestrictionRule) -> Self {
        Self {
            index: RestrictionIndex::new(store),
            rule,
        }
    }

    /// Pre-check the items of a cart change before they are added.
    #[instrument(skip(self, change), fields(items = change.items.len()), err)]
    pub async fn check_cart_change(&self, change: &CartChange) -> Result<CartPreCheckResponse, StoreError> {
        if change.items.is_empty() {
            return Ok(CartPreCheckResponse::from_messages(vec![]));
        }
        let restrictions = self.index.restrictions_for_products(&change.product_refs()).await?;
        let response = check_items(&change.items, &restrictions, &self.rule);
        if !response.is_success {
            info!(rejected = response.messages.len(), "cart change rejected");
        }
        Ok(response)
    }

    /// Re-evaluate a quote against current list state and drop restricted items.
    #[instrument(skip(self, quote), fields(items = quote.items.len()), err)]
    pub async fn filter_restricted_items(&self, quote: Quote) -> Result<Quote, StoreError> {
        if quote.items.is_empty() {
            return Ok(quote);
        }
        let restrictions = self.index.restrictions_for_products(&quote.product_refs()).await?;
        let (quote, removed) = strip_restricted(quote, &restrictions, &self.rule);
        for item in &removed {
            warn!(sku = %item.sku, product_concrete_id = %item.product_concrete_id, "removed restricted quote item");
        }
        Ok(quote)
    }
}
