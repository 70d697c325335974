//! Configuration loading: raw bytes → validated [`Config`].

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::{Config, ConfigDocument, DEFAULT_INTERVAL_SECS, DEFAULT_TIMEOUT_SECS};
use crate::config::validation::{effective_duration, validate_origins};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML config is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("failed to build config client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("failed to fetch config from {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("config service {url} answered with status {status}")]
    FetchStatus { url: String, status: u16 },

    #[error("config has no valid origins ({rejected} rejected), refusing to use it")]
    EmptyConfig { rejected: usize },
}

/// Document encodings the loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// JSON documents are objects, so a leading `{` decides it; anything else is TOML.
    pub fn sniff(raw: &[u8]) -> Self {
        match raw.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'{') => ConfigFormat::Json,
            _ => ConfigFormat::Toml,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "json" => Some(ConfigFormat::Json),
            "toml" => Some(ConfigFormat::Toml),
            _ => None,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ConfigFormat::Json => "application/json",
            ConfigFormat::Toml => "application/toml",
        }
    }
}

/// Load a config from raw bytes, detecting the format.
pub fn load(raw: &[u8]) -> Result<Config, ConfigError> {
    load_as(raw, ConfigFormat::sniff(raw))
}

/// Load a config from raw bytes in a known format.
pub fn load_as(raw: &[u8], format: ConfigFormat) -> Result<Config, ConfigError> {
    let document = parse_document(raw, format)?;
    from_document(document)
}

/// Load and validate configuration from a file on disk.
pub fn load_file(path: &Path) -> Result<Config, ConfigError> {
    let raw = fs::read(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let format = ConfigFormat::from_path(path).unwrap_or_else(|| ConfigFormat::sniff(&raw));
    load_as(&raw, format)
}

/// Syntactic step only: bytes → [`ConfigDocument`].
pub fn parse_document(raw: &[u8], format: ConfigFormat) -> Result<ConfigDocument, ConfigError> {
    let document = match format {
        ConfigFormat::Json => serde_json::from_slice(raw)?,
        ConfigFormat::Toml => toml::from_str(std::str::from_utf8(raw)?)?,
    };
    Ok(document)
}

/// Semantic step: apply defaults, drop invalid origins, reject empty results.
pub fn from_document(document: ConfigDocument) -> Result<Config, ConfigError> {
    let timeout = effective_duration(document.timeout, DEFAULT_TIMEOUT_SECS);
    let interval = effective_duration(document.interval, DEFAULT_INTERVAL_SECS);

    tracing::info!(
        source_id = %document.source_id,
        origins = document.origins.len(),
        timeout_secs = timeout.as_secs(),
        interval_secs = interval.as_secs(),
        "Config document parsed"
    );

    let (origins, rejected) = validate_origins(&document.origins);
    for reason in &rejected {
        tracing::warn!(
            source_id = %document.source_id,
            timeout_secs = timeout.as_secs(),
            interval_secs = interval.as_secs(),
            "Skipping origin: {}",
            reason
        );
    }

    if origins.is_empty() {
        let err = ConfigError::EmptyConfig {
            rejected: rejected.len(),
        };
        tracing::error!(source_id = %document.source_id, "{}", err);
        return Err(err);
    }

    tracing::info!(valid = origins.len(), rejected = rejected.len(), "Loaded valid origins");

    Ok(Config {
        source_id: document.source_id,
        origins,
        timeout,
        interval,
    })
}
