use serde::{Deserialize, Serialize};

use productlist_core::Message;

use crate::product_list::ProductList;

/// Translation keys for list-management outcomes.
pub mod messages {
    pub const CREATED: &str = "product_list.info.created";
    pub const UPDATED: &str = "product_list.info.updated";
    pub const REMOVED: &str = "product_list.info.removed";
    pub const TITLE_REQUIRED: &str = "product_list.error.title_required";
    pub const ID_REQUIRED: &str = "product_list.error.id_required";
    pub const NOT_FOUND: &str = "product_list.error.not_found";
    pub const TYPE_IMMUTABLE: &str = "product_list.error.type_immutable";
    pub const ID_IMMUTABLE: &str = "product_list.error.id_immutable";
}

/// Outcome of a create/update/remove call.
///
/// Business failures (validation, not found, hook veto) are reported here
/// with `is_successful == false`; they are never raised as errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductListResponse {
    pub product_list: ProductList,
    pub is_successful: bool,
    pub messages: Vec<Message>,
}

impl ProductListResponse {
    pub fn success(product_list: ProductList, messages: Vec<Message>) -> Self {
        Self {
            product_list,
            is_successful: true,
            messages,
        }
    }

    pub fn failure(product_list: ProductList, messages: Vec<Message>) -> Self {
        Self {
            product_list,
            is_successful: false,
            messages,
        }
    }

    pub fn has_message(&self, value: &str) -> bool {
        self.messages.iter().any(|m| m.value == value)
    }
}
