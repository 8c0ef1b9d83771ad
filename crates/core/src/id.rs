//! Strongly-typed identifiers used across the domain.
//!
//! All identifiers are storage-assigned integer keys. Wrapping them keeps a
//! category id from being passed where a product list id is expected.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of a product list.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductListId(i64);

/// Identifier of a catalog category.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(i64);

/// Identifier of an abstract product (the definition grouping sellable variants).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductAbstractId(i64);

/// Identifier of a concrete product (a purchasable variant).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductConcreteId(i64);

macro_rules! impl_int_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i64> for $t {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$t> for i64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value = s
                    .trim()
                    .parse::<i64>()
                    .map_err(|e| DomainError::invalid_id($name, e.to_string()))?;
                if value <= 0 {
                    return Err(DomainError::invalid_id(
                        $name,
                        format!("must be positive, got {value}"),
                    ));
                }
                Ok(Self(value))
            }
        }
    };
}

impl_int_newtype!(ProductListId, "product list");
impl_int_newtype!(CategoryId, "category");
impl_int_newtype!(ProductAbstractId, "abstract product");
impl_int_newtype!(ProductConcreteId, "concrete product");
