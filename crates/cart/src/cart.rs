use serde::{Deserialize, Serialize};

use productlist_core::{Message, ProductAbstractId, ProductConcreteId};

/// Abstract + concrete identity of a sellable product.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProductRef {
    pub product_abstract_id: ProductAbstractId,
    pub product_concrete_id: ProductConcreteId,
}

impl ProductRef {
    pub fn new(product_abstract_id: ProductAbstractId, product_concrete_id: ProductConcreteId) -> Self {
        Self {
            product_abstract_id,
            product_concrete_id,
        }
    }
}

/// A line in a cart change or a quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub sku: String,
    pub product_abstract_id: ProductAbstractId,
    pub product_concrete_id: ProductConcreteId,
    pub quantity: u32,
}

/// Items already in a quote use the same shape as items being added.
pub type QuoteItem = CartItem;

impl CartItem {
    pub fn new(
        sku: impl Into<String>,
        product_abstract_id: ProductAbstractId,
        product_concrete_id: ProductConcreteId,
        quantity: u32,
    ) -> Self {
        Self {
            sku: sku.into(),
            product_abstract_id,
            product_concrete_id,
            quantity,
        }
    }

    pub fn product_ref(&self) -> ProductRef {
        ProductRef::new(self.product_abstract_id, self.product_concrete_id)
    }
}

/// In-progress cart/order subject to restriction filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub items: Vec<QuoteItem>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Quote {
    pub fn new(items: Vec<QuoteItem>) -> Self {
        Self {
            items,
            messages: Vec::new(),
        }
    }

    pub fn product_refs(&self) -> Vec<ProductRef> {
        self.items.iter().map(CartItem::product_ref).collect()
    }
}

/// Items a customer is about to add to their quote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartChange {
    pub quote: Quote,
    pub items: Vec<CartItem>,
}

impl CartChange {
    pub fn new(quote: Quote, items: Vec<CartItem>) -> Self {
        Self { quote, items }
    }

    pub fn product_refs(&self) -> Vec<ProductRef> {
        self.items.iter().map(CartItem::product_ref).collect()
    }
}

/// Verdict of the add-to-cart pre-check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartPreCheckResponse {
    pub is_success: bool,
    pub messages: Vec<Message>,
}

impl CartPreCheckResponse {
    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self {
            is_success: messages.is_empty(),
            messages,
        }
    }
}
