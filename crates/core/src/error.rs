//! Domain error model.

use thiserror::Error;

use crate::id::ProductListId;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Rule violations on product lists and their identifiers.
///
/// Storage failures belong to the infra layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("product list title cannot be blank")]
    BlankTitle,

    /// A persisted list was asked to switch between blacklist and whitelist.
    #[error("product list type is immutable (persisted: {persisted}, requested: {requested})")]
    TypeChanged {
        persisted: &'static str,
        requested: &'static str,
    },

    /// The list identity differs from the one the write started with.
    #[error("product list id changed during write (expected {expected:?}, got {actual:?})")]
    IdChanged {
        expected: Option<ProductListId>,
        actual: Option<ProductListId>,
    },

    /// Text that should hold a storage key is not a positive integer.
    #[error("invalid {kind} id: {reason}")]
    InvalidId { kind: &'static str, reason: String },

    /// Text that names none of an enumeration's values (list type, whitelist precedence).
    #[error("unknown {kind} '{value}'")]
    UnknownVariant { kind: &'static str, value: String },
}

impl DomainError {
    pub fn invalid_id(kind: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidId {
            kind,
            reason: reason.into(),
        }
    }

    pub fn unknown_variant(kind: &'static str, value: impl Into<String>) -> Self {
        Self::UnknownVariant {
            kind,
            value: value.into(),
        }
    }
}
