//! Single-origin probe.
//!
//! # Flow
//! ```text
//! GET derived_url (timeout from the round)
//!     → transport error / non-2xx: failure result, done
//!     → 2xx: success result
//!         → simple mode: done, body never read
//!         → advanced mode: parse OriginResponse
//!             → token check against TokenCache
//!             → drift + latency recorded
//! ```
//!
//! A body that fails to parse, a repeated token, or a bad timestamp are
//! returned as errors but do not add a failure result: the HTTP exchange
//! itself succeeded and was already counted. Consumers that want content
//! failures should alert on the drift/timing series going stale.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use thiserror::Error;

use crate::config::schema::{OriginEntry, OriginMode};
use crate::observability::metrics;
use crate::probe::drift::{as_secs_f64, estimate_drift, parse_server_time};
use crate::probe::token_cache::{RepeatedToken, TokenCache, TokenCacheEntry};
use crate::probe::transport::{ProbeTransport, TransportError};
use crate::protocol::OriginResponse;

/// Reason label recorded for successful attempts.
pub const REASON_OK: &str = "ok";

/// Values shared by every probe in one round.
#[derive(Debug, Clone)]
pub struct RoundContext {
    pub source_id: Arc<str>,
    pub timeout: Duration,
}

/// A probe that completed without error.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    /// Simple mode: the origin answered 2xx.
    Reachable,
    /// Advanced mode: fresh token, timing and drift recorded.
    Fresh(FreshSample),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FreshSample {
    pub identifier: String,
    pub latency: Duration,
    pub drift_secs: f64,
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("origin answered with status {0}")]
    Status(u16),

    #[error("malformed origin response: {0}")]
    MalformedResponse(#[from] serde_json::Error),

    #[error(transparent)]
    RepeatedToken(#[from] RepeatedToken),

    #[error("invalid server time '{value}': {source}")]
    InvalidServerTime {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("probe task ended abnormally: {0}")]
    Aborted(String),
}

impl ProbeError {
    /// Short label for logs and metric reasons.
    pub fn reason(&self) -> String {
        match self {
            ProbeError::Transport(e) => e.reason().to_string(),
            ProbeError::Status(code) => format!("status-{}", code),
            ProbeError::MalformedResponse(_) => "malformed_response".to_string(),
            ProbeError::RepeatedToken(_) => "repeated_token".to_string(),
            ProbeError::InvalidServerTime { .. } => "invalid_server_time".to_string(),
            ProbeError::Aborted(_) => "aborted".to_string(),
        }
    }
}

/// Runs probes against origins. Cheap to clone; clones share the token cache.
pub struct ProbeExecutor<T> {
    transport: Arc<T>,
    tokens: TokenCache,
}

impl<T> Clone for ProbeExecutor<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            tokens: self.tokens.clone(),
        }
    }
}

impl<T: ProbeTransport> ProbeExecutor<T> {
    pub fn new(transport: Arc<T>, tokens: TokenCache) -> Self {
        Self { transport, tokens }
    }

    pub fn tokens(&self) -> &TokenCache {
        &self.tokens
    }

    /// Probe one origin once. No retries; the next round is the retry.
    pub async fn probe(&self, origin: &OriginEntry, round: &RoundContext) -> Result<ProbeOutcome, ProbeError> {
        let origin_id = origin.origin_id();
        let source_id = round.source_id.as_ref();
        let advanced = origin.mode == OriginMode::Advanced;

        let wall_start = Utc::now();
        let started = Instant::now();

        let reply = match self
            .transport
            .fetch(&origin.derived_url, round.timeout, advanced)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                metrics::record_probe_result(&origin_id, source_id, false, e.reason());
                tracing::error!(
                    scheme = %origin.scheme,
                    hostname = %origin.hostname,
                    port = origin.port,
                    reason = e.reason(),
                    error = %e,
                    "Probe request failed"
                );
                return Err(e.into());
            }
        };
        let elapsed = started.elapsed();

        if !reply.is_success() {
            let err = ProbeError::Status(reply.status);
            metrics::record_probe_result(&origin_id, source_id, false, &err.reason());
            tracing::error!(
                scheme = %origin.scheme,
                hostname = %origin.hostname,
                port = origin.port,
                status = reply.status,
                "Origin answered with error status"
            );
            return Err(err);
        }

        metrics::record_probe_result(&origin_id, source_id, true, REASON_OK);

        if !advanced {
            tracing::debug!(origin = %origin_id, elapsed_ms = elapsed.as_millis() as u64, "Simple origin reachable");
            return Ok(ProbeOutcome::Reachable);
        }

        let response: OriginResponse = serde_json::from_slice(&reply.body).map_err(|e| {
            tracing::error!(
                scheme = %origin.scheme,
                hostname = %origin.hostname,
                port = origin.port,
                error = %e,
                "Error parsing origin response"
            );
            ProbeError::from(e)
        })?;

        let entry = TokenCacheEntry {
            identifier: response.identifier.clone(),
            token: response.token.clone(),
            server_time: response.server_time.clone(),
        };
        if let Err(repeated) = self.tokens.observe(&origin.derived_url, entry) {
            // The success result above stays recorded for this attempt.
            tracing::error!(
                origin = %origin_id,
                token = %repeated.token,
                server_time = %repeated.server_time,
                "Received repeated token, response was likely cached en route"
            );
            return Err(repeated.into());
        }

        let server_time = parse_server_time(&response.server_time).map_err(|source| {
            tracing::error!(
                scheme = %origin.scheme,
                hostname = %origin.hostname,
                port = origin.port,
                server_time = %response.server_time,
                error = %source,
                "Unexpected error parsing origin server time"
            );
            ProbeError::InvalidServerTime {
                value: response.server_time.clone(),
                source,
            }
        })?;

        let drift_secs = as_secs_f64(estimate_drift(wall_start, elapsed, server_time));
        let label = if response.identifier.is_empty() {
            origin_id.as_str()
        } else {
            response.identifier.as_str()
        };
        metrics::record_origin_time_drift(label, source_id, drift_secs);
        metrics::record_probe_timing(label, source_id, elapsed);

        tracing::debug!(
            origin = %origin_id,
            identifier = label,
            elapsed_ms = elapsed.as_millis() as u64,
            drift_secs,
            "Advanced probe complete"
        );

        Ok(ProbeOutcome::Fresh(FreshSample {
            identifier: label.to_string(),
            latency: elapsed,
            drift_secs,
        }))
    }
}
