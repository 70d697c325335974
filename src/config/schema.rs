//! Configuration schema definitions.
//!
//! Two layers live here:
//! - [`ConfigDocument`]: the wire form shared by config files and the
//!   distribution service. Every field has a default so partial documents
//!   deserialize, and semantic checks are left to `validation.rs`.
//! - [`Config`]: the validated, normalized form the leaf actually probes with.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Path advanced-mode origins expose the token/drift protocol on.
pub const ADVANCED_PROBE_PATH: &str = "/probe";

/// Applied when the document omits `timeout` or sets it to zero.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Applied when the document omits `interval` or sets it to zero.
pub const DEFAULT_INTERVAL_SECS: u64 = 10;

/// Upper bound for `timeout`, `interval` and the reload period: one day.
pub const MAX_DURATION_SECS: u64 = 86_400;

/// Highest port an origin entry may use.
pub const MAX_ORIGIN_PORT: i64 = 32767;

/// Root configuration document as distributed to leaves.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ConfigDocument {
    /// Identifier of the leaf fleet this document is meant for.
    pub source_id: String,

    /// Per-probe timeout in seconds (0 = default).
    pub timeout: i64,

    /// Probe round interval in seconds (0 = default).
    pub interval: i64,

    /// Origins to poll, in order.
    pub origins: Vec<OriginDocument>,
}

/// A single origin as written in the document, before validation.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct OriginDocument {
    pub scheme: String,
    pub hostname: String,
    pub port: i64,

    /// "simple" or "advanced"; absent means advanced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

/// URL scheme accepted for origins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "http" => Some(Scheme::Http),
            "https" => Some(Scheme::Https),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much of the probe protocol an origin speaks.
///
/// Simple origins are plain health endpoints where only a 2xx matters.
/// Advanced origins answer with an [`OriginResponse`](crate::protocol::OriginResponse)
/// and are checked for cached responses and clock drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OriginMode {
    Simple,
    #[default]
    Advanced,
}

impl OriginMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "simple" => Some(OriginMode::Simple),
            "advanced" | "" => Some(OriginMode::Advanced),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OriginMode::Simple => "simple",
            OriginMode::Advanced => "advanced",
        }
    }
}

impl fmt::Display for OriginMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated origin, ready to probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginEntry {
    pub scheme: Scheme,
    pub hostname: String,
    pub port: u16,
    pub mode: OriginMode,
    /// Computed once during validation.
    pub derived_url: String,
}

impl OriginEntry {
    /// Stable label for result metrics, independent of what the origin reports.
    pub fn origin_id(&self) -> String {
        format!("{}-{}-{}", self.hostname, self.port, self.scheme)
    }

    pub fn to_document(&self) -> OriginDocument {
        OriginDocument {
            scheme: self.scheme.as_str().to_string(),
            hostname: self.hostname.clone(),
            port: i64::from(self.port),
            mode: Some(self.mode.as_str().to_string()),
        }
    }
}

/// Validated leaf configuration. Replaced wholesale on reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub source_id: String,
    pub origins: Vec<OriginEntry>,
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_id: String::new(),
            origins: Vec::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
        }
    }
}

impl Config {
    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }

    /// Convert back to the wire form. Loading the result yields an equal `Config`.
    pub fn to_document(&self) -> ConfigDocument {
        ConfigDocument {
            source_id: self.source_id.clone(),
            timeout: self.timeout.as_secs() as i64,
            interval: self.interval.as_secs() as i64,
            origins: self.origins.iter().map(OriginEntry::to_document).collect(),
        }
    }
}
