//! Environment-driven configuration and wiring.
//!
//! | variable | default |
//! |----------|---------|
//! | `USE_PERSISTENT_STORES` | `false` |
//! | `DATABASE_URL` | required when persistent |
//! | `PRODUCT_LIST_DEFAULT_PAGE_SIZE` | `50` |
//! | `PRODUCT_LIST_MAX_PAGE_SIZE` | `1000` |
//! | `PRODUCT_LIST_WHITELIST_PRECEDENCE` | `product` (`product` or `strict`) |

use std::sync::Arc;

use anyhow::Context;
use thiserror::Error;

use productlist_cart::{RestrictionRule, WhitelistPrecedence};
use productlist_lists::ProductListHooks;
use productlist_lists::criteria::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

use crate::facade::ProductListFacade;
use crate::repository::PageLimits;
use crate::store::{InMemoryProductListStore, PostgresProductListStore, ProductListStore};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set when USE_PERSISTENT_STORES=true")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductListConfig {
    /// `Some` selects the Postgres store.
    pub database_url: Option<String>,
    pub page_limits: PageLimits,
    pub whitelist_precedence: WhitelistPrecedence,
}

impl Default for ProductListConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            page_limits: PageLimits::default(),
            whitelist_precedence: WhitelistPrecedence::default(),
        }
    }
}

impl ProductListConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let use_persistent = match lookup("USE_PERSISTENT_STORES") {
            Some(raw) => parse("USE_PERSISTENT_STORES", &raw)?,
            None => false,
        };
        let database_url = if use_persistent {
            let url = lookup("DATABASE_URL")
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing("DATABASE_URL"))?;
            Some(url)
        } else {
            None
        };

        let default_page_size = match lookup("PRODUCT_LIST_DEFAULT_PAGE_SIZE") {
            Some(raw) => positive("PRODUCT_LIST_DEFAULT_PAGE_SIZE", &raw)?,
            None => DEFAULT_PAGE_SIZE,
        };
        let max_page_size = match lookup("PRODUCT_LIST_MAX_PAGE_SIZE") {
            Some(raw) => positive("PRODUCT_LIST_MAX_PAGE_SIZE", &raw)?,
            None => MAX_PAGE_SIZE,
        };
        if default_page_size > max_page_size {
            return Err(ConfigError::Invalid {
                key: "PRODUCT_LIST_DEFAULT_PAGE_SIZE",
                value: default_page_size.to_string(),
                reason: format!("exceeds PRODUCT_LIST_MAX_PAGE_SIZE ({max_page_size})"),
            });
        }

        let whitelist_precedence = match lookup("PRODUCT_LIST_WHITELIST_PRECEDENCE") {
            Some(raw) => parse("PRODUCT_LIST_WHITELIST_PRECEDENCE", &raw)?,
            None => WhitelistPrecedence::default(),
        };

        Ok(Self {
            database_url,
            page_limits: PageLimits {
                default_page_size,
                max_page_size,
            },
            whitelist_precedence,
        })
    }

    pub fn use_persistent_stores(&self) -> bool {
        self.database_url.is_some()
    }
}

fn parse<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
        key,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn positive(key: &'static str, raw: &str) -> Result<u32, ConfigError> {
    match parse::<u32>(key, raw)? {
        0 => Err(ConfigError::Invalid {
            key,
            value: raw.to_string(),
            reason: "must be greater than zero".to_string(),
        }),
        n => Ok(n),
    }
}

/// Wire a facade over the store selected by `config`.
///
/// The Postgres store has its tables created if missing.
pub async fn build_facade(
    config: &ProductListConfig,
    hooks: ProductListHooks,
) -> anyhow::Result<ProductListFacade<dyn ProductListStore>> {
    let store: Arc<dyn ProductListStore> = match &config.database_url {
        Some(url) => {
            let store = PostgresProductListStore::connect(url)
                .await
                .context("failed to connect to Postgres")?;
            store
                .ensure_schema()
                .await
                .context("failed to bootstrap product list schema")?;
            tracing::info!("using Postgres product list store");
            Arc::new(store)
        }
        None => {
            tracing::info!("using in-memory product list store");
            Arc::new(InMemoryProductListStore::new())
        }
    };

    Ok(ProductListFacade::with_options(
        store,
        hooks,
        RestrictionRule::new(config.whitelist_precedence),
        config.page_limits,
    ))
}
