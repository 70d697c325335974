//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Probe executor produces:
//!     → logging.rs (structured log events with origin/scheme/reason)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape), kept alive by resilience::supervisor
//! ```
//!
//! # Design Decisions
//! - Metrics exposition failing never stops probing
//! - Result series are labeled by the configured origin, timing and drift by
//!   the identifier the origin reports

pub mod logging;
pub mod metrics;
