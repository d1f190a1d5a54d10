//! In-Memory Backend
//!
//! Reference [`CacheBackend`] engine keeping everything in process memory.
//! Entries carry an absolute deadline and are removed lazily by the first
//! read that finds them expired. A background sweep can be enabled with the
//! `sweep_interval_ms` option.
//!
//! Recognized options:
//!
//! | Key | Meaning |
//! |-----|---------|
//! | `shards` | Map shard amount, a power of two greater than 1 |
//! | `sweep_interval_ms` | Start the reaper with this period (needs a tokio runtime) |
//!
//! Other keys are ignored.

mod reaper;
mod stats;
mod store;

pub use reaper::Reaper;
pub use stats::CacheStats;
pub use store::{default_shard_amount, Entry, TtlStore};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::backend::{BackendConfig, CacheBackend};
use crate::error::{CacheError, Result};
use crate::registry::{BackendFactory, BackendRegistry};

/// Registry name of the in-memory engine
pub const MEMORY_BACKEND: &str = "memory";

const OPT_SHARDS: &str = "shards";
const OPT_SWEEP_INTERVAL_MS: &str = "sweep_interval_ms";

/// Process-local cache engine
#[derive(Debug, Default)]
pub struct MemoryBackend {
    store: TtlStore,
    initialized: bool,
    closed: AtomicBool,
    reaper: Mutex<Option<JoinHandle<()>>>,
}

impl MemoryBackend {
    /// Fresh, uninitialized backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory suitable for [`BackendRegistry::register`]
    pub fn factory() -> BackendFactory {
        Arc::new(|| -> Box<dyn CacheBackend> { Box::new(MemoryBackend::new()) })
    }

    /// Register this engine under [`MEMORY_BACKEND`]
    pub fn register(registry: &BackendRegistry) -> Result<()> {
        registry.register(MEMORY_BACKEND, || Box::new(MemoryBackend::new()))
    }

    /// Counter snapshot
    pub fn stats(&self) -> CacheStats {
        self.store.stats()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(CacheError::Closed(MEMORY_BACKEND));
        }
        Ok(())
    }

    fn stop_reaper(&self) {
        if let Some(handle) = self.reaper.lock().take() {
            handle.abort();
            info!("TTL reaper stopped");
        }
    }
}

fn shard_amount(config: &BackendConfig) -> Result<usize> {
    match config.option::<usize>(OPT_SHARDS)? {
        None => Ok(default_shard_amount()),
        Some(n) if n > 1 && n.is_power_of_two() => Ok(n),
        Some(n) => Err(CacheError::config(format!(
            "'{}' must be a power of two greater than 1, got {}",
            OPT_SHARDS, n
        ))),
    }
}

fn sweep_interval(config: &BackendConfig) -> Result<Option<Duration>> {
    match config.option::<u64>(OPT_SWEEP_INTERVAL_MS)? {
        None => Ok(None),
        Some(0) => Err(CacheError::config(format!(
            "'{}' must be positive",
            OPT_SWEEP_INTERVAL_MS
        ))),
        Some(ms) => Ok(Some(Duration::from_millis(ms))),
    }
}

/// The reaper runs on the caller's tokio runtime
fn reaper_runtime(sweep: Option<Duration>) -> Result<Option<Handle>> {
    match sweep {
        None => Ok(None),
        Some(_) => Handle::try_current().map(Some).map_err(|_| {
            CacheError::config(format!(
                "'{}' requires a running tokio runtime",
                OPT_SWEEP_INTERVAL_MS
            ))
        }),
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        MEMORY_BACKEND
    }

    async fn init(&mut self, config: &BackendConfig) -> Result<()> {
        if self.initialized {
            return Err(CacheError::AlreadyInitialized(MEMORY_BACKEND));
        }

        let shards = shard_amount(config)?;
        let sweep = sweep_interval(config)?;
        let runtime = reaper_runtime(sweep)?;

        for key in config.options.keys() {
            if key != OPT_SHARDS && key != OPT_SWEEP_INTERVAL_MS {
                debug!(option = %key, "Ignoring unknown memory backend option");
            }
        }

        self.store = TtlStore::with_shard_amount(shards);
        if let (Some(interval), Some(runtime)) = (sweep, runtime) {
            let reaper = Reaper::new(self.store.clone(), interval);
            *self.reaper.get_mut() = Some(runtime.spawn(reaper.run()));
        }
        self.initialized = true;

        info!(shards, sweep_interval = ?sweep, "Memory cache backend initialized");
        Ok(())
    }

    async fn check_health(&self) -> Result<()> {
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        Ok(self.store.get(key))
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()> {
        self.ensure_open()?;
        self.store.set(key, value, ttl);
        Ok(())
    }

    async fn get_many(&self, keys: &[&str]) -> Vec<Option<Bytes>> {
        keys.iter().map(|key| self.store.get(key)).collect()
    }

    async fn set_many(&self, entries: Vec<(String, Bytes)>, ttl: Duration) -> Result<()> {
        self.ensure_open()?;
        for (key, value) in entries {
            self.store.set(&key, value, ttl);
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> bool {
        self.store.delete(key)
    }

    async fn delete_many(&self, keys: &[&str]) -> bool {
        // No short-circuit: every key must be removed.
        keys.iter()
            .fold(false, |deleted, key| self.store.delete(key) || deleted)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> bool {
        self.store.expire(key, ttl)
    }

    async fn ttl(&self, key: &str) -> Duration {
        self.store.ttl(key)
    }

    async fn exists(&self, key: &str) -> bool {
        self.store.exists(key)
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.stop_reaper();
            info!(summary = %self.store.stats().summary(), "Memory cache backend closed");
        }
        Ok(())
    }
}

impl Drop for MemoryBackend {
    fn drop(&mut self) {
        if let Some(handle) = self.reaper.get_mut().take() {
            handle.abort();
        }
    }
}
