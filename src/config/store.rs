//! Shared, hot-swappable configuration.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::schema::Config;

/// Holds the active [`Config`] for every probe round.
///
/// Readers get an `Arc` snapshot that stays valid for as long as they hold it,
/// so a round started before a reload finishes against the config it began with.
/// Writers replace the whole value; there are no partial updates.
pub struct ConfigStore {
    current: ArcSwap<Config>,
    generation: AtomicU64,
}

impl ConfigStore {
    /// An empty store. Nothing should be probed until the first `write`.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            current: ArcSwap::from_pointee(config),
            generation: AtomicU64::new(0),
        }
    }

    /// Snapshot of the active config.
    pub fn read(&self) -> Arc<Config> {
        self.current.load_full()
    }

    /// Atomically replace the active config.
    pub fn write(&self, config: Config) {
        self.current.store(Arc::new(config));
        self.generation.fetch_add(1, Ordering::Release);
    }

    /// Number of successful writes since construction.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}
