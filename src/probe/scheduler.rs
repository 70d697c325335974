//! Periodic probe rounds.
//!
//! # Responsibilities
//! - Fire a round every `interval` from the active config
//! - Fan out one task per origin against a single config snapshot
//! - Summarize failures per round without ever stopping the loop

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tokio::time::{self, MissedTickBehavior};
use uuid::Uuid;

use crate::config::schema::Config;
use crate::config::settings::local_hostname;
use crate::config::store::ConfigStore;
use crate::config::validation::{bounded_period, next_deadline};
use crate::probe::executor::{ProbeError, ProbeExecutor, RoundContext};
use crate::probe::transport::ProbeTransport;

/// What a round does with its other probes once one has failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum RoundPolicy {
    /// Every probe runs to completion; one flaky origin does not blind the rest.
    #[default]
    LetAllFinish,
    /// The first failure aborts the probes still in flight.
    CancelOnFirstError,
}

/// Counts from a round in which every probe succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundReport {
    pub attempted: usize,
    pub succeeded: usize,
}

#[derive(Debug)]
pub struct OriginFailure {
    pub origin_id: String,
    pub error: ProbeError,
}

/// At least one probe in the round failed.
#[derive(Debug, Error)]
pub struct RoundError {
    pub attempted: usize,
    pub succeeded: usize,
    /// Probes aborted under [`RoundPolicy::CancelOnFirstError`].
    pub cancelled: usize,
    pub failures: Vec<OriginFailure>,
}

impl fmt::Display for RoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {} origins failed", self.failures.len(), self.attempted)?;
        if self.cancelled > 0 {
            write!(f, " ({} cancelled)", self.cancelled)?;
        }
        for (i, failure) in self.failures.iter().enumerate() {
            f.write_str(if i == 0 { ": " } else { ", " })?;
            write!(f, "{} [{}] {}", failure.origin_id, failure.error.reason(), failure.error)?;
        }
        Ok(())
    }
}

/// Drives probe rounds from the [`ConfigStore`].
pub struct ProbeScheduler<T> {
    store: Arc<ConfigStore>,
    executor: ProbeExecutor<T>,
    policy: RoundPolicy,
    leaf_id: Option<Arc<str>>,
}

impl<T> Clone for ProbeScheduler<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            executor: self.executor.clone(),
            policy: self.policy,
            leaf_id: self.leaf_id.clone(),
        }
    }
}

impl<T: ProbeTransport> ProbeScheduler<T> {
    pub fn new(store: Arc<ConfigStore>, executor: ProbeExecutor<T>, policy: RoundPolicy) -> Self {
        Self {
            store,
            executor,
            policy,
            leaf_id: None,
        }
    }

    /// Override the `source_id` from the config document.
    pub fn with_leaf_id(mut self, leaf_id: Option<String>) -> Self {
        self.leaf_id = leaf_id.filter(|id| !id.is_empty()).map(Arc::from);
        self
    }

    /// Explicit leaf id, then the document's `source_id`, then the host name.
    fn source_id_for(&self, config: &Config) -> Arc<str> {
        match &self.leaf_id {
            Some(id) => id.clone(),
            None if !config.source_id.is_empty() => Arc::from(config.source_id.as_str()),
            None => Arc::from(local_hostname()),
        }
    }

    /// Probe every origin in the current snapshot once.
    pub async fn run_round(&self) -> Result<RoundReport, RoundError> {
        let config = self.store.read();
        if config.is_empty() {
            tracing::debug!("No origins configured, skipping round");
            return Ok(RoundReport {
                attempted: 0,
                succeeded: 0,
            });
        }

        let round = RoundContext {
            source_id: self.source_id_for(&config),
            timeout: config.timeout,
        };
        let round_id = Uuid::new_v4();
        tracing::debug!(round_id = %round_id, origins = config.origins.len(), "Checking origin servers");

        let mut tasks = JoinSet::new();
        for origin in config.origins.iter().cloned() {
            let executor = self.executor.clone();
            let round = round.clone();
            tasks.spawn(async move {
                let result = executor.probe(&origin, &round).await;
                (origin.origin_id(), result)
            });
        }

        let attempted = config.origins.len();
        let mut succeeded = 0;
        let mut cancelled = 0;
        let mut failures = Vec::new();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(_))) => succeeded += 1,
                Ok((origin_id, Err(error))) => {
                    failures.push(OriginFailure { origin_id, error });
                    if self.policy == RoundPolicy::CancelOnFirstError && !tasks.is_empty() {
                        tracing::warn!(
                            round_id = %round_id,
                            in_flight = tasks.len(),
                            "Cancelling remaining probes after first failure"
                        );
                        tasks.abort_all();
                    }
                }
                Err(e) if e.is_cancelled() => cancelled += 1,
                Err(e) => {
                    tracing::error!(round_id = %round_id, error = %e, "Probe task panicked");
                    failures.push(OriginFailure {
                        origin_id: "unknown".to_string(),
                        error: ProbeError::Aborted(e.to_string()),
                    });
                }
            }
        }

        if failures.is_empty() && cancelled == 0 {
            tracing::debug!(round_id = %round_id, succeeded, "Round complete");
            Ok(RoundReport { attempted, succeeded })
        } else {
            Err(RoundError {
                attempted,
                succeeded,
                cancelled,
                failures,
            })
        }
    }

    /// Run rounds until shutdown.
    ///
    /// Each round runs in its own task so a slow round never delays the next
    /// tick. The ticker follows interval changes from reloads.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let mut period = bounded_period(self.store.read().interval);
        tracing::info!(
            interval_secs = period.as_secs(),
            policy = ?self.policy,
            "Probe scheduler starting"
        );

        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut rounds = JoinSet::new();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let scheduler = self.clone();
                    rounds.spawn(async move {
                        if let Err(e) = scheduler.run_round().await {
                            tracing::error!(error = %e, "Error probing at least one origin");
                        }
                    });

                    let next = bounded_period(self.store.read().interval);
                    if next != period {
                        tracing::info!(
                            from_secs = period.as_secs(),
                            to_secs = next.as_secs(),
                            "Probe interval changed"
                        );
                        period = next;
                        ticker = time::interval_at(next_deadline(period), period);
                        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    }
                }
                Some(_) = rounds.join_next(), if !rounds.is_empty() => {}
                _ = shutdown.recv() => {
                    tracing::info!("Probe scheduler received shutdown signal, exiting loop");
                    break;
                }
            }
        }

        rounds.shutdown().await;
    }
}
