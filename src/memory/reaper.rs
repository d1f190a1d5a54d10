//! Expired Key Reaper
//!
//! Opt-in background task that periodically removes expired keys. Reads
//! already treat expired entries as absent; the reaper only bounds memory
//! held by keys that are written and never read again.

use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use super::TtlStore;

/// Background TTL sweep task for [`TtlStore`]
pub struct Reaper {
    store: TtlStore,
    interval: Duration,
}

impl Reaper {
    /// Create a new reaper
    pub fn new(store: TtlStore, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// Run the reaper (should be spawned as a task)
    pub async fn run(self) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval = ?self.interval, "TTL reaper started");

        loop {
            ticker.tick().await;
            let removed = self.store.purge_expired();
            if removed > 0 {
                debug!(removed = removed, "Swept expired keys");
            }
        }
    }

    /// Spawn the reaper on the current tokio runtime
    pub fn spawn(store: TtlStore, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(Self::new(store, interval).run())
    }
}
