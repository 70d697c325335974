//! Resilience subsystem.
//!
//! # Design Decisions
//! - Probes are never retried within a round; the next tick is the retry
//! - Background servers restart under a bounded sliding-window policy
//! - A supervisor that gives up only stops its own task

pub mod supervisor;

pub use supervisor::{supervise, RestartPolicy, RestartWindow, SupervisorError};
