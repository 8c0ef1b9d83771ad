use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use productlist_core::{CategoryId, DomainError, DomainResult, ProductConcreteId, ProductListId};

/// Restriction semantics of a product list.
///
/// A blacklist forbids the products it covers. A whitelist permits only the
/// products it covers within the scope it governs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductListType {
    Blacklist,
    Whitelist,
}

impl ProductListType {
    pub fn as_str(self) -> &'static str {
        match self {
            ProductListType::Blacklist => "blacklist",
            ProductListType::Whitelist => "whitelist",
        }
    }
}

impl core::fmt::Display for ProductListType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for ProductListType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blacklist" => Ok(ProductListType::Blacklist),
            "whitelist" => Ok(ProductListType::Whitelist),
            other => Err(DomainError::unknown_variant("product list type", other)),
        }
    }
}

/// A named collection of categories and concrete products with restriction semantics.
///
/// `id` is `None` until the list has been saved for the first time. Relation
/// sets are only populated when the caller hydrated them; base-record reads
/// leave them empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductList {
    pub id: Option<ProductListId>,
    pub title: String,
    #[serde(rename = "type")]
    pub list_type: ProductListType,
    #[serde(default)]
    pub category_ids: BTreeSet<CategoryId>,
    #[serde(default)]
    pub product_concrete_ids: BTreeSet<ProductConcreteId>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProductList {
    /// Create a new, not-yet-persisted list.
    pub fn new(title: impl Into<String>, list_type: ProductListType) -> Self {
        Self {
            id: None,
            title: title.into(),
            list_type,
            category_ids: BTreeSet::new(),
            product_concrete_ids: BTreeSet::new(),
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_id(mut self, id: ProductListId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_categories(mut self, ids: impl IntoIterator<Item = CategoryId>) -> Self {
        self.category_ids.extend(ids);
        self
    }

    pub fn with_products(mut self, ids: impl IntoIterator<Item = ProductConcreteId>) -> Self {
        self.product_concrete_ids.extend(ids);
        self
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    pub fn is_blacklist(&self) -> bool {
        self.list_type == ProductListType::Blacklist
    }

    pub fn is_whitelist(&self) -> bool {
        self.list_type == ProductListType::Whitelist
    }

    /// A list must carry a non-blank title.
    pub fn validate_title(&self) -> DomainResult<()> {
        if self.title.trim().is_empty() {
            return Err(DomainError::BlankTitle);
        }
        Ok(())
    }

    /// The type of a persisted list never changes.
    pub fn ensure_same_type(&self, persisted: &ProductList) -> DomainResult<()> {
        if self.list_type != persisted.list_type {
            return Err(DomainError::TypeChanged {
                persisted: persisted.list_type.as_str(),
                requested: self.list_type.as_str(),
            });
        }
        Ok(())
    }

    /// The id a write carries must be the one it started with.
    pub fn ensure_id(&self, expected: Option<ProductListId>) -> DomainResult<()> {
        if self.id != expected {
            return Err(DomainError::IdChanged {
                expected,
                actual: self.id,
            });
        }
        Ok(())
    }
}

/// List ids grouped by list type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductListIdsByType {
    pub blacklist: BTreeSet<ProductListId>,
    pub whitelist: BTreeSet<ProductListId>,
}

impl ProductListIdsByType {
    pub fn insert(&mut self, list_type: ProductListType, id: ProductListId) {
        match list_type {
            ProductListType::Blacklist => self.blacklist.insert(id),
            ProductListType::Whitelist => self.whitelist.insert(id),
        };
    }

    pub fn ids(&self, list_type: ProductListType) -> &BTreeSet<ProductListId> {
        match list_type {
            ProductListType::Blacklist => &self.blacklist,
            ProductListType::Whitelist => &self.whitelist,
        }
    }

    pub fn merge(&mut self, other: &ProductListIdsByType) {
        self.blacklist.extend(other.blacklist.iter().copied());
        self.whitelist.extend(other.whitelist.iter().copied());
    }

    pub fn is_empty(&self) -> bool {
        self.blacklist.is_empty() && self.whitelist.is_empty()
    }
}
