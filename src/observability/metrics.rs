//! Metrics collection and exposition.
//!
//! # Metrics
//! - `leaf_probe_timings` (histogram): latency of successful advanced probes, seconds
//! - `leaf_probe_results` (counter): every attempt, by result and reason
//! - `leaf_origin_time_drift` (gauge): estimated origin clock drift, seconds
//! - `leaf_origin_status` (gauge): 1 if the latest probe succeeded, else 0
//!
//! All series carry `origin_id` and `source_id`.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{extract::State, routing::get, Router};
use metrics::Unit;
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder};
use tokio::net::TcpListener;

pub const PROBE_TIMINGS: &str = "leaf_probe_timings";
pub const PROBE_RESULTS: &str = "leaf_probe_results";
pub const ORIGIN_TIME_DRIFT: &str = "leaf_origin_time_drift";
pub const ORIGIN_STATUS: &str = "leaf_origin_status";

/// Histogram buckets for probe latency, in seconds.
pub const TIMING_BUCKETS: &[f64] = &[0.0, 0.05, 0.1, 0.5, 1.0, 2.0];

/// Build a recorder with the probe histogram buckets applied.
pub fn build_recorder() -> Result<PrometheusRecorder, BuildError> {
    Ok(PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(PROBE_TIMINGS.to_string()), TIMING_BUCKETS)?
        .build_recorder())
}

/// Install the global recorder and return the handle used to render it.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(PROBE_TIMINGS.to_string()), TIMING_BUCKETS)?
        .install_recorder()?;
    describe_metrics();
    Ok(handle)
}

fn describe_metrics() {
    metrics::describe_histogram!(
        PROBE_TIMINGS,
        Unit::Seconds,
        "Timing of a successful probe to an origin"
    );
    metrics::describe_counter!(PROBE_RESULTS, "Result of an attempted probe to an origin");
    metrics::describe_gauge!(
        ORIGIN_TIME_DRIFT,
        Unit::Seconds,
        "Perceived clock drift of the origin server"
    );
    metrics::describe_gauge!(
        ORIGIN_STATUS,
        "Current status of an origin from the perspective of this leaf"
    );
}

/// Count a probe attempt and mirror it into the status gauge.
pub fn record_probe_result(origin_id: &str, source_id: &str, success: bool, reason: &str) {
    metrics::counter!(
        PROBE_RESULTS,
        "origin_id" => origin_id.to_owned(),
        "source_id" => source_id.to_owned(),
        "result" => success.to_string(),
        "reason" => reason.to_owned()
    )
    .increment(1);

    metrics::gauge!(
        ORIGIN_STATUS,
        "origin_id" => origin_id.to_owned(),
        "source_id" => source_id.to_owned()
    )
    .set(if success { 1.0 } else { 0.0 });
}

pub fn record_probe_timing(origin_id: &str, source_id: &str, latency: Duration) {
    metrics::histogram!(
        PROBE_TIMINGS,
        "origin_id" => origin_id.to_owned(),
        "source_id" => source_id.to_owned()
    )
    .record(latency.as_secs_f64());
}

pub fn record_origin_time_drift(origin_id: &str, source_id: &str, drift_secs: f64) {
    metrics::gauge!(
        ORIGIN_TIME_DRIFT,
        "origin_id" => origin_id.to_owned(),
        "source_id" => source_id.to_owned()
    )
    .set(drift_secs);
}

/// Router exposing the Prometheus text format at `/metrics`.
pub fn metrics_router(handle: PrometheusHandle) -> Router {
    Router::new()
        .route("/metrics", get(render_metrics))
        .with_state(handle)
}

async fn render_metrics(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}

/// One run of the metrics listener. Returns when the listener fails;
/// the supervisor decides whether to start another.
pub async fn serve_metrics(addr: SocketAddr, handle: PrometheusHandle) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(address = %listener.local_addr()?, "Metrics listener bound");
    axum::serve(listener, metrics_router(handle)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rendered_series() {
        let recorder = build_recorder().unwrap();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            record_probe_result("h-1234-http", "leaf-1", true, "ok");
            record_probe_result("h-1234-http", "leaf-1", false, "status-503");
            record_probe_timing("origin-a", "leaf-1", Duration::from_millis(70));
            record_origin_time_drift("origin-a", "leaf-1", 1.5);
        });

        let rendered = handle.render();
        assert!(rendered.contains(PROBE_RESULTS));
        assert!(rendered.contains("reason=\"status-503\""));
        assert!(rendered.contains("result=\"false\""));
        assert!(rendered.contains(ORIGIN_STATUS));
        assert!(rendered.contains(&format!("{}_bucket", PROBE_TIMINGS)));
        assert!(rendered.contains("le=\"0.1\""));
        assert!(rendered.contains(ORIGIN_TIME_DRIFT));
        assert!(rendered.contains("source_id=\"leaf-1\""));
    }

    #[test]
    fn test_status_gauge_tracks_latest_result() {
        let recorder = build_recorder().unwrap();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            record_probe_result("h-1-http", "leaf", true, "ok");
            record_probe_result("h-1-http", "leaf", false, "timeout");
        });

        let status_lines: Vec<_> = handle
            .render()
            .lines()
            .filter(|l| l.starts_with(ORIGIN_STATUS))
            .map(str::to_string)
            .collect();
        assert_eq!(status_lines.len(), 1);
        let value: f64 = status_lines[0].rsplit(' ').next().unwrap().parse().unwrap();
        assert_eq!(value, 0.0);
    }
}
