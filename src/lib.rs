//! Fleet health probing.
//!
//! Leaves periodically probe a configured set of origins, reject responses
//! replayed by caches, estimate origin clock drift, and expose results as
//! Prometheus metrics.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod probe;
pub mod protocol;
pub mod resilience;

pub use config::{Config, ConfigStore};
pub use lifecycle::Shutdown;
pub use probe::{ProbeExecutor, ProbeScheduler};
