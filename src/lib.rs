//! kvcache - Pluggable Key-Value Cache Backends
//!
//! A uniform [`CacheBackend`] contract, a [`BackendRegistry`] that builds
//! engines by name, and a reference in-memory engine with lazily expiring
//! per-key TTLs.
//!
//! ```no_run
//! use bytes::Bytes;
//! use kvcache::{BackendConfig, BackendRegistry};
//! use std::time::Duration;
//!
//! # async fn demo() -> kvcache::Result<()> {
//! let registry = BackendRegistry::with_builtin_backends();
//! let cache = registry.open(&BackendConfig::new("memory")).await?;
//!
//! cache.set("a", Bytes::from_static(b"1"), Duration::from_millis(100)).await?;
//! assert_eq!(cache.get("a").await?, Some(Bytes::from_static(b"1")));
//! cache.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod error;
pub mod memory;
pub mod registry;

pub use backend::{BackendConfig, CacheBackend};
pub use error::{CacheError, Result};
pub use memory::{CacheStats, MemoryBackend, MEMORY_BACKEND};
pub use registry::{BackendFactory, BackendRegistry};
