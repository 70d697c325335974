//! fleet-probe leaf agent.
//!
//! # Architecture Overview
//!
//! ```text
//!   config file / distribution service
//!          │  (reload timer, file watch)
//!          ▼
//!   ConfigReloader ──▶ ConfigStore ◀── ProbeScheduler (tick)
//!                                          │ one task per origin
//!                                          ▼
//!                                    ProbeExecutor ──▶ origins (GET /probe)
//!                                          │
//!                              TokenCache  │  metrics
//!                                          ▼
//!                               /metrics (supervised listener)
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use fleet_probe::config::settings::LeafSettings;
use fleet_probe::config::source::fetch_client;
use fleet_probe::config::{ConfigReloader, ConfigStore};
use fleet_probe::lifecycle::signals::listen_for_signals;
use fleet_probe::lifecycle::Shutdown;
use fleet_probe::observability::{logging, metrics};
use fleet_probe::probe::{HttpTransport, ProbeExecutor, ProbeScheduler, TokenCache};
use fleet_probe::resilience::{supervise, RestartPolicy};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = LeafSettings::parse();
    logging::init(settings.log_format);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "fleet-probe leaf starting");

    // An unusable startup config is fatal.
    let source = settings.source();
    let client = fetch_client()?;
    let config = source.load(&client).await.map_err(|e| {
        tracing::error!(source = %source, error = %e, "Failed to load startup config");
        e
    })?;

    tracing::info!(
        source = %source,
        origins = config.origins.len(),
        interval_secs = config.interval.as_secs(),
        timeout_secs = config.timeout.as_secs(),
        round_policy = ?settings.round_policy,
        "Configuration loaded"
    );

    let store = Arc::new(ConfigStore::with_config(config));
    let shutdown = Shutdown::new();
    tokio::spawn(listen_for_signals(shutdown.clone()));

    match metrics::init_metrics() {
        Ok(handle) => {
            let addr = SocketAddr::from(([0, 0, 0, 0], settings.metrics_port));
            let rx = shutdown.subscribe();
            tokio::spawn(async move {
                let supervised = supervise("metrics", RestartPolicy::default(), rx, || {
                    metrics::serve_metrics(addr, handle.clone())
                })
                .await;
                if let Err(e) = supervised {
                    tracing::error!(error = %e, "Metrics exposition stopped permanently, probing continues");
                }
            });
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to install metrics recorder, probing continues without exposition");
        }
    }

    let reloader = ConfigReloader::new(
        source,
        store.clone(),
        Duration::from_secs(settings.reload_secs),
        client,
    );
    let reload_task = tokio::spawn(reloader.run(shutdown.subscribe()));

    let transport = Arc::new(HttpTransport::new()?);
    let executor = ProbeExecutor::new(transport, TokenCache::new());
    let scheduler = ProbeScheduler::new(store, executor, settings.round_policy)
        .with_leaf_id(settings.leaf_id.clone());

    scheduler.run(shutdown.subscribe()).await;

    if let Err(e) = reload_task.await {
        tracing::warn!(error = %e, "Config reloader ended abnormally");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
