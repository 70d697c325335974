//! Full probe rounds against real responders, with metrics captured.

mod common;

use std::sync::Arc;

use fleet_probe::config::{load, ConfigStore};
use fleet_probe::lifecycle::Shutdown;
use fleet_probe::observability::metrics::{
    build_recorder, ORIGIN_STATUS, ORIGIN_TIME_DRIFT, PROBE_RESULTS, PROBE_TIMINGS,
};
use fleet_probe::probe::{HttpTransport, ProbeExecutor, ProbeScheduler, RoundPolicy, TokenCache};

fn scheduler(raw: &str, policy: RoundPolicy) -> ProbeScheduler<HttpTransport> {
    let store = Arc::new(ConfigStore::with_config(load(raw.as_bytes()).unwrap()));
    let executor = ProbeExecutor::new(Arc::new(HttpTransport::new().unwrap()), TokenCache::new());
    ProbeScheduler::new(store, executor, policy)
}

#[tokio::test]
async fn test_round_against_origin_responder() {
    let shutdown = Shutdown::new();
    let responder = common::start_origin_responder("origin-live", &shutdown).await;
    let raw = common::config_json("leaf-it", 2, &[common::origin_json(responder, "advanced")]);
    let scheduler = scheduler(&raw, RoundPolicy::LetAllFinish);

    // Every call mints a fresh token, so repeated rounds stay healthy.
    for _ in 0..3 {
        let report = scheduler.run_round().await.unwrap();
        assert_eq!(report.succeeded, 1);
    }

    shutdown.trigger("test");
}

#[tokio::test(flavor = "current_thread")]
async fn test_mixed_round_records_metrics() {
    let recorder = build_recorder().unwrap();
    let handle = recorder.handle();
    let _guard = metrics::set_default_local_recorder(&recorder);

    let shutdown = Shutdown::new();
    let healthy = common::start_origin_responder("origin-ok", &shutdown).await;
    let failing = common::start_programmable_origin(|_| async { (503, String::new()) }).await;
    let refused = common::closed_port().await;

    let raw = common::config_json(
        "leaf-it",
        2,
        &[
            common::origin_json(healthy, "advanced"),
            common::origin_json(failing, "simple"),
            common::origin_json(refused, "simple"),
        ],
    );
    let err = scheduler(&raw, RoundPolicy::LetAllFinish)
        .run_round()
        .await
        .unwrap_err();

    assert_eq!(err.attempted, 3);
    assert_eq!(err.succeeded, 1);
    let mut reasons: Vec<_> = err.failures.iter().map(|f| f.error.reason()).collect();
    reasons.sort();
    assert_eq!(reasons, vec!["connect".to_string(), "status-503".to_string()]);

    let rendered = handle.render();
    assert!(rendered.contains(PROBE_RESULTS));
    assert!(rendered.contains(ORIGIN_STATUS));
    assert!(rendered.contains(&format!("{}_bucket", PROBE_TIMINGS)));
    assert!(rendered.contains(ORIGIN_TIME_DRIFT));
    assert!(rendered.contains("origin_id=\"origin-ok\""));
    assert!(rendered.contains("reason=\"status-503\""));
    assert!(rendered.contains("source_id=\"leaf-it\""));

    shutdown.trigger("test");
}

#[tokio::test]
async fn test_cancel_policy_stops_stalled_probe() {
    let stalled = common::start_stalled_origin().await;
    let refused = common::closed_port().await;
    let raw = common::config_json(
        "leaf-it",
        30,
        &[common::origin_json(stalled, "simple"), common::origin_json(refused, "simple")],
    );

    let started = std::time::Instant::now();
    let err = scheduler(&raw, RoundPolicy::CancelOnFirstError)
        .run_round()
        .await
        .unwrap_err();

    assert_eq!(err.failures.len(), 1);
    assert_eq!(err.cancelled, 1);
    assert!(started.elapsed() < std::time::Duration::from_secs(10));
}
