//! Cache Errors
//!
//! A missing or expired key is never an error: reads report it as `Ok(None)`.

use thiserror::Error;

/// Errors returned by cache backends and the backend registry
#[derive(Debug, Error)]
pub enum CacheError {
    /// Invalid or missing configuration passed to `init`
    #[error("invalid backend configuration: {0}")]
    Config(String),

    /// `init` was called more than once on the same instance
    #[error("backend '{0}' is already initialized")]
    AlreadyInitialized(&'static str),

    /// A backend with this name is already registered
    #[error("backend '{0}' is already registered")]
    DuplicateBackend(String),

    /// No backend is registered under this name
    #[error("backend '{0}' not found")]
    BackendNotFound(String),

    /// Operational failure of the underlying store
    #[error("backend error: {0}")]
    Backend(String),

    /// Write attempted on a closed backend
    #[error("backend '{0}' is closed")]
    Closed(&'static str),
}

impl CacheError {
    pub fn config(msg: impl Into<String>) -> Self {
        CacheError::Config(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CacheError::BackendNotFound("redis".to_string());
        assert_eq!(err.to_string(), "backend 'redis' not found");

        let err = CacheError::config("shards must be a power of two");
        assert!(err.to_string().contains("shards must be a power of two"));
    }
}
