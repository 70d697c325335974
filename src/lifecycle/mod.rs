//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → every subscribed loop (scheduler, reloader, supervisor, servers) exits
//! ```
//!
//! # Design Decisions
//! - One broadcast channel; each long-running task holds its own receiver
//! - In-flight probe rounds are aborted, not drained

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
