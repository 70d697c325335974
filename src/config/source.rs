//! Where configuration documents come from.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::loader::{self, ConfigError, ConfigFormat};
use crate::config::schema::Config;

/// Upper bound on a config fetch from the distribution service.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Path the distribution service serves documents on.
pub const CONFIG_PATH: &str = "/config";

/// Origin of the leaf's configuration document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// A document on local disk.
    File(PathBuf),
    /// Full URL of a distribution service's config endpoint.
    Remote(String),
}

impl ConfigSource {
    /// Build a remote source from a service base URL like `http://config:9300`.
    pub fn remote(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        if base.ends_with(CONFIG_PATH) {
            ConfigSource::Remote(base.to_string())
        } else {
            ConfigSource::Remote(format!("{}{}", base, CONFIG_PATH))
        }
    }

    /// The file to watch for changes, if any.
    pub fn watch_path(&self) -> Option<&Path> {
        match self {
            ConfigSource::File(path) => Some(path),
            ConfigSource::Remote(_) => None,
        }
    }

    /// Fetch the raw document bytes and the format they are in.
    pub async fn fetch_raw(
        &self,
        client: &reqwest::Client,
    ) -> Result<(Vec<u8>, ConfigFormat), ConfigError> {
        match self {
            ConfigSource::File(path) => {
                let raw = tokio::fs::read(path).await.map_err(|source| ConfigError::Io {
                    path: path.clone(),
                    source,
                })?;
                let format = ConfigFormat::from_path(path).unwrap_or_else(|| ConfigFormat::sniff(&raw));
                Ok((raw, format))
            }
            ConfigSource::Remote(url) => {
                let response = client
                    .get(url)
                    .timeout(FETCH_TIMEOUT)
                    .send()
                    .await
                    .map_err(|source| ConfigError::Fetch {
                        url: url.clone(),
                        source,
                    })?;

                let status = response.status();
                if !status.is_success() {
                    return Err(ConfigError::FetchStatus {
                        url: url.clone(),
                        status: status.as_u16(),
                    });
                }

                let raw = response.bytes().await.map_err(|source| ConfigError::Fetch {
                    url: url.clone(),
                    source,
                })?;
                let format = ConfigFormat::sniff(&raw);
                Ok((raw.to_vec(), format))
            }
        }
    }

    /// Fetch and validate.
    pub async fn load(&self, client: &reqwest::Client) -> Result<Config, ConfigError> {
        let (raw, format) = self.fetch_raw(client).await?;
        loader::load_as(&raw, format)
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "file:{}", path.display()),
            ConfigSource::Remote(url) => f.write_str(url),
        }
    }
}

/// HTTP client used for config fetches.
pub fn fetch_client() -> Result<reqwest::Client, ConfigError> {
    reqwest::Client::builder()
        .connect_timeout(FETCH_TIMEOUT)
        .timeout(FETCH_TIMEOUT)
        .build()
        .map_err(ConfigError::Client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_remote_normalization() {
        assert_eq!(
            ConfigSource::remote("http://config:9300"),
            ConfigSource::Remote("http://config:9300/config".into())
        );
        assert_eq!(
            ConfigSource::remote("http://config:9300/"),
            ConfigSource::Remote("http://config:9300/config".into())
        );
        assert_eq!(
            ConfigSource::remote("http://config:9300/config"),
            ConfigSource::Remote("http://config:9300/config".into())
        );
    }

    #[tokio::test]
    async fn test_file_source_loads() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(br#"{"origins": [{"scheme": "http", "hostname": "h", "port": 1}]}"#)
            .unwrap();

        let source = ConfigSource::File(file.path().to_path_buf());
        let client = fetch_client().unwrap();
        let config = source.load(&client).await.unwrap();
        assert_eq!(config.origins.len(), 1);
        assert_eq!(source.watch_path(), Some(file.path()));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let source = ConfigSource::File(PathBuf::from("/nonexistent/fleet-probe/leaf.json"));
        let client = fetch_client().unwrap();
        assert!(matches!(source.load(&client).await, Err(ConfigError::Io { .. })));
    }
}
