//! Outbound HTTP for probes.
//!
//! # Design Decisions
//! - No connection reuse: every probe pays the full dial and TLS handshake,
//!   which is part of what is being measured
//! - The round's timeout bounds the whole call (connect, TLS, response)
//! - The body is only read when the caller asks for it

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// Transport-level failure. Carries the classification used as a metric reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl TransportError {
    /// Short label for the `reason` metric dimension.
    pub fn reason(&self) -> &'static str {
        match self {
            TransportError::Timeout(_) => "timeout",
            TransportError::Connect(_) => "connect",
            TransportError::Request(_) => "transport",
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout(e.to_string())
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

/// What came back from an origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginReply {
    pub status: u16,
    /// Empty unless the body was requested and the status was 2xx.
    pub body: Vec<u8>,
}

impl OriginReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues a single GET against an origin.
pub trait ProbeTransport: Send + Sync + 'static {
    fn fetch(
        &self,
        url: &str,
        timeout: Duration,
        read_body: bool,
    ) -> impl Future<Output = Result<OriginReply, TransportError>> + Send;
}

/// reqwest-backed transport used in production.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .no_proxy()
            .user_agent(concat!("fleet-probe/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl ProbeTransport for HttpTransport {
    async fn fetch(
        &self,
        url: &str,
        timeout: Duration,
        read_body: bool,
    ) -> Result<OriginReply, TransportError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = if read_body && response.status().is_success() {
            response.bytes().await?.to_vec()
        } else {
            Vec::new()
        };

        Ok(OriginReply { status, body })
    }
}
