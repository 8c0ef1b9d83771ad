//! Restriction decision rule.
//!
//! - Any blacklist that applies to a product (directly or through one of its
//!   categories) rejects it.
//! - A whitelist that targets one of the product's categories *governs* the
//!   product. A governed product is admitted only if it is a member of a
//!   whitelist through its own concrete id. Which whitelists count as
//!   membership is decided by [`WhitelistPrecedence`].
//! - A product without governing whitelists is unrestricted.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use productlist_core::{DomainError, ProductListId};

/// Lists relevant to one product, split by how they reach it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRestrictions {
    /// Blacklists targeting the concrete product or one of its categories.
    pub blacklist_ids: BTreeSet<ProductListId>,
    /// Whitelists reaching the product through category membership.
    pub category_whitelist_ids: BTreeSet<ProductListId>,
    /// Whitelists targeting the concrete product itself.
    pub product_whitelist_ids: BTreeSet<ProductListId>,
}

impl ProductRestrictions {
    pub fn is_empty(&self) -> bool {
        self.blacklist_ids.is_empty()
            && self.category_whitelist_ids.is_empty()
            && self.product_whitelist_ids.is_empty()
    }
}

/// How product-level whitelist membership interacts with category-level whitelists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WhitelistPrecedence {
    /// Membership in any whitelist through the concrete id admits the product.
    #[default]
    ProductOverridesCategory,
    /// Membership counts only for a whitelist that also governs the product's categories.
    StrictCategory,
}

impl core::str::FromStr for WhitelistPrecedence {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "product" | "product_overrides_category" => Ok(Self::ProductOverridesCategory),
            "strict" | "strict_category" => Ok(Self::StrictCategory),
            other => Err(DomainError::unknown_variant("whitelist precedence", other)),
        }
    }
}

/// Why a product was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RestrictionReason {
    Blacklisted { list_ids: BTreeSet<ProductListId> },
    NotWhitelisted { governing_list_ids: BTreeSet<ProductListId> },
}

impl RestrictionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RestrictionReason::Blacklisted { .. } => "blacklisted",
            RestrictionReason::NotWhitelisted { .. } => "not_whitelisted",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestrictionRule {
    precedence: WhitelistPrecedence,
}

impl RestrictionRule {
    pub fn new(precedence: WhitelistPrecedence) -> Self {
        Self { precedence }
    }

    /// `None` when the product may be bought.
    pub fn evaluate(&self, restrictions: &ProductRestrictions) -> Option<RestrictionReason> {
        if !restrictions.blacklist_ids.is_empty() {
            return Some(RestrictionReason::Blacklisted {
                list_ids: restrictions.blacklist_ids.clone(),
            });
        }

        let governing = &restrictions.category_whitelist_ids;
        if governing.is_empty() {
            return None;
        }

        let is_member = match self.precedence {
            WhitelistPrecedence::ProductOverridesCategory => {
                !restrictions.product_whitelist_ids.is_empty()
            }
            WhitelistPrecedence::StrictCategory => !restrictions
                .product_whitelist_ids
                .is_disjoint(governing),
        };

        if is_member {
            None
        } else {
            Some(RestrictionReason::NotWhitelisted {
                governing_list_ids: governing.clone(),
            })
        }
    }

    pub fn is_restricted(&self, restrictions: &ProductRestrictions) -> bool {
        self.evaluate(restrictions).is_some()
    }
}
