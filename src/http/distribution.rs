//! Config distribution service.
//!
//! Serves one document, validated once at startup, to every leaf. The bytes
//! go out exactly as they were read so leaves see the operator's file.

use std::path::Path;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};

use crate::config::loader::{self, ConfigError, ConfigFormat};
use crate::config::schema::Config;
use crate::config::source::CONFIG_PATH;
use crate::http::server::with_layers;
use crate::http::HEALTH_PATH;

/// A validated document ready to serve.
#[derive(Debug, Clone)]
pub struct ServedDocument {
    raw: Bytes,
    format: ConfigFormat,
}

impl ServedDocument {
    /// Validate `raw` and keep it for serving. Documents with no valid
    /// origins are rejected here so leaves never receive them.
    pub fn new(raw: impl Into<Bytes>, format: ConfigFormat) -> Result<(Self, Config), ConfigError> {
        let raw = raw.into();
        let config = loader::load_as(&raw, format)?;
        Ok((Self { raw, format }, config))
    }

    pub fn from_file(path: &Path) -> Result<(Self, Config), ConfigError> {
        let raw = std::fs::read(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let format = ConfigFormat::from_path(path).unwrap_or_else(|| ConfigFormat::sniff(&raw));
        Self::new(raw, format)
    }

    pub fn format(&self) -> ConfigFormat {
        self.format
    }
}

pub fn router(document: ServedDocument) -> Router {
    let routes = Router::new()
        .route(CONFIG_PATH, get(serve_config))
        .route(HEALTH_PATH, get(healthz))
        .with_state(document);
    with_layers(routes)
}

async fn serve_config(State(document): State<ServedDocument>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, document.format.content_type())], document.raw)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
