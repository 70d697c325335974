//! Periodic config refresh, plus change notifications for file sources.

use std::sync::Arc;
use std::time::Duration;

use notify::{Config as NotifyConfig, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{self, MissedTickBehavior};

use crate::config::loader::ConfigError;
use crate::config::source::ConfigSource;
use crate::config::store::ConfigStore;
use crate::config::validation::{bounded_period, next_deadline};

/// Result of a successful reload attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    Replaced,
    Unchanged,
}

/// Refreshes a [`ConfigStore`] from a [`ConfigSource`] on its own timer,
/// independent of the probe rounds.
///
/// A failed reload leaves the active config in place.
pub struct ConfigReloader {
    source: ConfigSource,
    store: Arc<ConfigStore>,
    period: Duration,
    client: reqwest::Client,
}

impl ConfigReloader {
    pub fn new(
        source: ConfigSource,
        store: Arc<ConfigStore>,
        period: Duration,
        client: reqwest::Client,
    ) -> Self {
        Self {
            source,
            store,
            period: bounded_period(period),
            client,
        }
    }

    /// Fetch, validate and, when it differs, swap in the new config.
    pub async fn reload_once(&self) -> Result<ReloadOutcome, ConfigError> {
        let config = self.source.load(&self.client).await?;

        if *self.store.read() == config {
            tracing::debug!(source = %self.source, "Config unchanged");
            return Ok(ReloadOutcome::Unchanged);
        }

        tracing::info!(
            source = %self.source,
            origins = config.origins.len(),
            interval_secs = config.interval.as_secs(),
            timeout_secs = config.timeout.as_secs(),
            "Config reloaded"
        );
        self.store.write(config);
        Ok(ReloadOutcome::Replaced)
    }

    /// Run until shutdown. The first reload happens one period after start,
    /// since the caller has already loaded the startup config.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let (changes_tx, mut changes_rx) = mpsc::unbounded_channel();
        // Dropping the watcher stops notifications, so it lives for the whole loop.
        let _watcher = self
            .source
            .watch_path()
            .and_then(|path| match watch_file(path, changes_tx) {
                Ok(watcher) => Some(watcher),
                Err(e) => {
                    tracing::warn!(path = ?path, error = %e, "Config file watch unavailable, relying on timer");
                    None
                }
            });

        tracing::info!(
            source = %self.source,
            period_secs = self.period.as_secs(),
            "Config reloader starting"
        );

        let mut ticker = time::interval_at(next_deadline(self.period), self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                Some(()) = changes_rx.recv() => {
                    tracing::info!(source = %self.source, "Config file change detected");
                }
                _ = shutdown.recv() => {
                    tracing::info!("Config reloader received shutdown signal, exiting loop");
                    break;
                }
            }

            if let Err(e) = self.reload_once().await {
                tracing::error!(
                    source = %self.source,
                    error = %e,
                    "Failed to reload config, keeping current configuration"
                );
            }
        }
    }
}

fn watch_file(
    path: &std::path::Path,
    changes: mpsc::UnboundedSender<()>,
) -> Result<RecommendedWatcher, notify::Error> {
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if event.kind.is_modify() || event.kind.is_create() {
                    let _ = changes.send(());
                }
            }
            Err(e) => tracing::error!("Config watch error: {:?}", e),
        },
        NotifyConfig::default().with_poll_interval(Duration::from_secs(2)),
    )?;

    watcher.watch(path, RecursiveMode::NonRecursive)?;
    tracing::info!(path = ?path, "Config watcher started");
    Ok(watcher)
}
