//! Cache Backend Contract
//!
//! Every storage engine implements [`CacheBackend`], so calling code can stay
//! engine-agnostic and pick an implementation by name through the
//! [`BackendRegistry`](crate::registry::BackendRegistry).
//!
//! ## Lifecycle
//!
//! 1. Construct through a registry factory (fresh, uninitialized)
//! 2. [`init`](CacheBackend::init) exactly once with a [`BackendConfig`]
//! 3. Share (typically as `Arc<dyn CacheBackend>`) and run data operations
//! 4. [`close`](CacheBackend::close) to release resources
//!
//! ## Cancellation
//!
//! Operations are futures. Callers bound them with `tokio::time::timeout`
//! or cancel them by dropping the future; engines that perform I/O must
//! abort at their next `.await` rather than finish a stale request. The
//! contract itself imposes no timeout.

mod config;

pub use config::BackendConfig;

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

use crate::error::Result;

/// Storage engine contract
///
/// All methods take `&self` (except `init`) and must be safe to call from many
/// tasks at once. Per-key atomicity is required; batch operations are not
/// atomic across keys.
///
/// A TTL is always relative to the moment of the call. A zero TTL stores an
/// entry that is already expired and therefore invisible to reads.
#[async_trait]
pub trait CacheBackend: Send + Sync + std::fmt::Debug {
    /// Engine name as registered, e.g. `"memory"`
    fn name(&self) -> &'static str;

    /// One-time setup from configuration
    async fn init(&mut self, config: &BackendConfig) -> Result<()>;

    /// Liveness probe; an error describes why the backend cannot serve
    async fn check_health(&self) -> Result<()>;

    /// Value for `key`, or `None` if missing or expired
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// Insert or overwrite `key`, expiring `ttl` from now
    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()>;

    /// Values for `keys` in input order; missing or expired keys yield `None`
    async fn get_many(&self, keys: &[&str]) -> Vec<Option<Bytes>>;

    /// Set every pair with the same TTL
    ///
    /// Not atomic: on error, pairs before the failing one may already be
    /// written.
    async fn set_many(&self, entries: Vec<(String, Bytes)>, ttl: Duration) -> Result<()>;

    /// Remove `key`; true if a live entry was present
    async fn delete(&self, key: &str) -> bool;

    /// Remove all `keys`; true if at least one live entry was removed
    async fn delete_many(&self, keys: &[&str]) -> bool;

    /// Reset the deadline of a live entry to `ttl` from now
    ///
    /// Returns false and does nothing if the key is missing or expired.
    async fn expire(&self, key: &str, ttl: Duration) -> bool;

    /// Remaining lifetime of `key`; zero if missing or expired
    async fn ttl(&self, key: &str) -> Duration;

    /// True iff a live entry exists for `key`
    async fn exists(&self, key: &str) -> bool;

    /// Release engine resources
    async fn close(&self) -> Result<()>;
}
