//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (JSON/TOML) or distribution service
//!     → source.rs (fetch raw bytes, bounded timeout)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (per-origin checks, defaults)
//!     → Config (validated, immutable)
//!     → store.rs (ArcSwap, snapshot per probe round)
//!
//! Every reload period, or on file change:
//!     watcher.rs fetches again
//!     → loader.rs / validation.rs
//!     → atomic swap in store.rs on success
//!     → previous config kept on any failure
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - Invalid origins are dropped individually; an empty result is an error
//! - Process settings (ports, leaf id) are separate from the fleet document

pub mod loader;
pub mod schema;
pub mod settings;
pub mod source;
pub mod store;
pub mod validation;
pub mod watcher;

pub use loader::{load, load_file, ConfigError, ConfigFormat};
pub use schema::{Config, ConfigDocument, OriginDocument, OriginEntry, OriginMode, Scheme};
pub use source::ConfigSource;
pub use store::ConfigStore;
pub use watcher::ConfigReloader;
