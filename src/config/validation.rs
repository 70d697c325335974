//! Configuration validation.
//!
//! # Responsibilities
//! - Check each origin's scheme, port and mode
//! - Build the probe URL once and make sure it parses
//! - Normalize timeout/interval defaults
//!
//! # Design Decisions
//! - An invalid origin is dropped on its own; the rest of the document survives
//! - Returns every rejection, not just the first, so the loader can log them all
//! - Pure functions: no I/O, no logging

use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use url::Url;

use crate::config::schema::{
    OriginDocument, OriginEntry, OriginMode, Scheme, ADVANCED_PROBE_PATH, MAX_DURATION_SECS,
    MAX_ORIGIN_PORT,
};

/// Why a single origin entry was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid scheme '{scheme}' for hostname {hostname} and port {port}")]
    InvalidScheme {
        scheme: String,
        hostname: String,
        port: i64,
    },

    #[error("invalid port {port} for hostname {hostname} and scheme {scheme}")]
    InvalidPort {
        port: i64,
        hostname: String,
        scheme: String,
    },

    #[error("invalid mode '{mode}' for {scheme}://{hostname}:{port}")]
    InvalidMode {
        mode: String,
        scheme: String,
        hostname: String,
        port: i64,
    },

    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Validate one origin and compute its probe URL.
pub fn validate_origin(origin: &OriginDocument) -> Result<OriginEntry, ValidationError> {
    let scheme = Scheme::parse(&origin.scheme).ok_or_else(|| ValidationError::InvalidScheme {
        scheme: origin.scheme.clone(),
        hostname: origin.hostname.clone(),
        port: origin.port,
    })?;

    if !(0..=MAX_ORIGIN_PORT).contains(&origin.port) {
        return Err(ValidationError::InvalidPort {
            port: origin.port,
            hostname: origin.hostname.clone(),
            scheme: origin.scheme.clone(),
        });
    }
    let port = origin.port as u16;

    let raw_mode = origin.mode.as_deref().unwrap_or_default();
    let mode = OriginMode::parse(raw_mode).ok_or_else(|| ValidationError::InvalidMode {
        mode: raw_mode.to_string(),
        scheme: origin.scheme.clone(),
        hostname: origin.hostname.clone(),
        port: origin.port,
    })?;

    let mut derived_url = format!("{}://{}:{}", scheme, origin.hostname, port);
    if mode == OriginMode::Advanced {
        derived_url.push_str(ADVANCED_PROBE_PATH);
    }

    if let Err(e) = Url::parse(&derived_url) {
        return Err(ValidationError::InvalidUrl {
            url: derived_url,
            reason: e.to_string(),
        });
    }

    Ok(OriginEntry {
        scheme,
        hostname: origin.hostname.clone(),
        port,
        mode,
        derived_url,
    })
}

/// Validate every origin, keeping document order for the survivors.
pub fn validate_origins(origins: &[OriginDocument]) -> (Vec<OriginEntry>, Vec<ValidationError>) {
    let mut valid = Vec::with_capacity(origins.len());
    let mut rejected = Vec::new();

    for origin in origins {
        match validate_origin(origin) {
            Ok(entry) => valid.push(entry),
            Err(e) => rejected.push(e),
        }
    }

    (valid, rejected)
}

/// Seconds from the document, falling back to `default_secs` when unset or
/// non-positive and capped at [`MAX_DURATION_SECS`].
pub fn effective_duration(raw_secs: i64, default_secs: u64) -> Duration {
    if raw_secs > 0 {
        Duration::from_secs((raw_secs as u64).min(MAX_DURATION_SECS))
    } else {
        Duration::from_secs(default_secs)
    }
}

/// When a ticker rebuilt now should first fire.
pub fn next_deadline(period: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(period)
        .unwrap_or_else(|| now + Duration::from_secs(MAX_DURATION_SECS))
}

/// Clamp a timer period to `1ms..=MAX_DURATION_SECS` so tickers can always be built.
pub fn bounded_period(period: Duration) -> Duration {
    period.clamp(Duration::from_millis(1), Duration::from_secs(MAX_DURATION_SECS))
}
