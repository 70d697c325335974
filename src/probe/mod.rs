//! Leaf-side probing.
//!
//! # Data Flow
//! ```text
//! scheduler.rs (tick, snapshot ConfigStore)
//!     → executor.rs (one task per origin)
//!         → transport.rs (HTTP GET with the round timeout)
//!         → token_cache.rs (reject replayed tokens)
//!         → drift.rs (clock skew estimate)
//!     → observability::metrics
//! ```

pub mod drift;
pub mod executor;
pub mod scheduler;
pub mod token_cache;
pub mod transport;

pub use executor::{ProbeError, ProbeExecutor, ProbeOutcome, RoundContext};
pub use scheduler::{ProbeScheduler, RoundError, RoundPolicy, RoundReport};
pub use token_cache::{TokenCache, TokenCacheEntry};
pub use transport::{HttpTransport, OriginReply, ProbeTransport, TransportError};
