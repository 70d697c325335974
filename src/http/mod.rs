//! HTTP servers.
//!
//! # Data Flow
//! ```text
//! TCP listener
//!     → server.rs (shared tower layers, graceful shutdown)
//!     → origin.rs (GET /probe, GET /healthz: fresh token + server time)
//!     → distribution.rs (GET /config: validated document bytes)
//! ```
//!
//! The leaf's own `/metrics` router lives in `observability::metrics`.

pub mod distribution;
pub mod origin;
pub mod server;

/// Liveness path served by every process.
pub const HEALTH_PATH: &str = "/healthz";

pub use server::serve;
