//! A metrics listener that can never bind gives up without affecting probing.

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use fleet_probe::config::{load, ConfigStore};
use fleet_probe::lifecycle::Shutdown;
use fleet_probe::observability::metrics::{build_recorder, serve_metrics};
use fleet_probe::probe::{HttpTransport, ProbeExecutor, ProbeScheduler, RoundPolicy, TokenCache};
use fleet_probe::resilience::{supervise, RestartPolicy, SupervisorError};

#[tokio::test]
async fn test_metrics_gives_up_while_rounds_succeed() {
    // Hold the port so every bind attempt fails.
    let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let metrics_addr = occupied.local_addr().unwrap();
    let handle = build_recorder().unwrap().handle();

    let shutdown = Shutdown::new();
    let responder = common::start_origin_responder("origin-iso", &shutdown).await;
    let raw = common::config_json("leaf-iso", 2, &[common::origin_json(responder, "advanced")]);
    let store = Arc::new(ConfigStore::with_config(load(raw.as_bytes()).unwrap()));
    let executor = ProbeExecutor::new(Arc::new(HttpTransport::new().unwrap()), TokenCache::new());
    let scheduler = ProbeScheduler::new(store, executor, RoundPolicy::LetAllFinish);

    let policy = RestartPolicy {
        window: Duration::from_secs(60),
        max_restarts: 2,
        delay: Duration::ZERO,
    };
    let supervised = supervise("metrics", policy, shutdown.subscribe(), || {
        serve_metrics(metrics_addr, handle.clone())
    });

    let (supervised, first_round) = tokio::join!(supervised, scheduler.run_round());

    match supervised {
        Err(SupervisorError::RestartLimit { restarts, .. }) => assert_eq!(restarts, 3),
        other => panic!("expected restart limit, got {:?}", other),
    }
    assert_eq!(first_round.unwrap().succeeded, 1);

    // Probing keeps working after exposition stopped for good.
    assert_eq!(scheduler.run_round().await.unwrap().succeeded, 1);

    drop(occupied);
    shutdown.trigger("test");
}
