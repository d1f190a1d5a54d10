//! Backend Configuration

use hashbrown::HashMap;
use std::str::FromStr;

use crate::error::{CacheError, Result};

/// Configuration handed to [`CacheBackend::init`](super::CacheBackend::init)
///
/// `backend` names the engine to construct through the registry. `options`
/// holds engine-specific settings; each engine reads the keys it knows and
/// ignores the rest.
#[derive(Debug, Clone, Default)]
pub struct BackendConfig {
    /// Registered engine name, e.g. `"memory"`
    pub backend: String,

    /// Engine-specific options
    pub options: HashMap<String, String>,
}

impl BackendConfig {
    /// Create a config for the named backend with no options
    pub fn new(backend: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            options: HashMap::new(),
        }
    }

    /// Set an engine option
    pub fn with_option(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.options.insert(key.into(), value.to_string());
        self
    }

    /// Parse a `key=value` pair, as given on the command line
    pub fn with_option_pair(self, pair: &str) -> Result<Self> {
        match pair.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok(self.with_option(key.trim(), value.trim()))
            }
            _ => Err(CacheError::config(format!(
                "option '{}' is not of the form key=value",
                pair
            ))),
        }
    }

    /// Raw option value
    pub fn raw_option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// Typed option value; `Ok(None)` when unset
    pub fn option<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.raw_option(key) {
            None => Ok(None),
            Some(raw) => raw.parse::<T>().map(Some).map_err(|e| {
                CacheError::config(format!("option '{}' = '{}': {}", key, raw, e))
            }),
        }
    }
}
