//! User-facing outcome messages.
//!
//! A message is a translation key plus named parameters. Rendering is left to
//! the caller (admin UI, storefront), so the key is stable and the parameters
//! carry the variable parts (e.g. the SKU of a removed cart item).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub value: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
}

impl Message {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.parameters.insert(key.into(), value.to_string());
        self
    }

    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }
}

impl core::fmt::Display for Message {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.value)?;
        for (k, v) in &self.parameters {
            write!(f, " {k}={v}")?;
        }
        Ok(())
    }
}
