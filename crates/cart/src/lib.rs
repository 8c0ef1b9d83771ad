//! Cart restriction domain module.
//!
//! Cart/quote shapes and the blacklist/whitelist decision rule, implemented as
//! pure functions over precomputed restrictions (no IO, no storage).

pub mod cart;
pub mod filter;
pub mod rule;

pub use cart::{CartChange, CartItem, CartPreCheckResponse, ProductRef, Quote, QuoteItem};
pub use filter::{check_items, messages, strip_restricted};
pub use rule::{ProductRestrictions, RestrictionReason, RestrictionRule, WhitelistPrecedence};
