//! Process settings for the three binaries.
//!
//! Each can be given as a flag or through its `FLEET_PROBE_*` environment variable.

use std::path::PathBuf;

use clap::Parser;

use crate::config::source::ConfigSource;
use crate::observability::logging::LogFormat;
use crate::probe::scheduler::RoundPolicy;

pub const DEFAULT_METRICS_PORT: u16 = 9299;
pub const DEFAULT_CONFIG_PORT: u16 = 9300;
pub const DEFAULT_ORIGIN_PORT: u16 = 9301;
pub const DEFAULT_CONFIG_PATH: &str = "/etc/fleet-probe/leaf.json";
pub const DEFAULT_RELOAD_SECS: u64 = 60;

/// Leaf agent settings.
#[derive(Debug, Clone, Parser)]
#[command(name = "fleet-probe", version, about = "Leaf agent probing fleet origins")]
pub struct LeafSettings {
    /// Path to the config document (JSON or TOML).
    #[arg(long, env = "FLEET_PROBE_CONF")]
    pub config: Option<PathBuf>,

    /// Base URL of a config distribution service; takes precedence over --config.
    #[arg(long, env = "FLEET_PROBE_CONFIG_URL")]
    pub config_url: Option<String>,

    /// Leaf identifier used as `source_id` on every metric.
    #[arg(long, env = "FLEET_PROBE_LEAF_ID")]
    pub leaf_id: Option<String>,

    #[arg(long, env = "FLEET_PROBE_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT, value_parser = parse_port)]
    pub metrics_port: u16,

    /// Seconds between config refreshes.
    #[arg(long, env = "FLEET_PROBE_RELOAD_SECS", default_value_t = DEFAULT_RELOAD_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub reload_secs: u64,

    /// What a probe round does when one origin fails.
    #[arg(long, env = "FLEET_PROBE_ROUND_POLICY", value_enum, default_value_t = RoundPolicy::LetAllFinish)]
    pub round_policy: RoundPolicy,

    #[arg(long, env = "FLEET_PROBE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl LeafSettings {
    pub fn source(&self) -> ConfigSource {
        match (&self.config_url, &self.config) {
            (Some(url), _) => ConfigSource::remote(url),
            (None, Some(path)) => ConfigSource::File(path.clone()),
            (None, None) => ConfigSource::File(PathBuf::from(DEFAULT_CONFIG_PATH)),
        }
    }
}

/// Origin responder settings.
#[derive(Debug, Clone, Parser)]
#[command(name = "fleet-probe-origin", version, about = "Answers leaf probes with fresh tokens")]
pub struct OriginSettings {
    #[arg(long, env = "FLEET_PROBE_ORIGIN_PORT", default_value_t = DEFAULT_ORIGIN_PORT, value_parser = parse_port)]
    pub port: u16,

    /// Identifier reported to leaves; defaults to the host name.
    #[arg(long, env = "FLEET_PROBE_ORIGIN_ID")]
    pub identifier: Option<String>,

    #[arg(long, env = "FLEET_PROBE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Config distribution service settings.
#[derive(Debug, Clone, Parser)]
#[command(name = "fleet-probe-config", version, about = "Serves the fleet config document to leaves")]
pub struct DistributionSettings {
    /// Config document to serve.
    #[arg(long, env = "FLEET_PROBE_CONF")]
    pub config: PathBuf,

    #[arg(long, env = "FLEET_PROBE_CONFIG_PORT", default_value_t = DEFAULT_CONFIG_PORT, value_parser = parse_port)]
    pub port: u16,

    #[arg(long, env = "FLEET_PROBE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Listening ports are restricted to 1..=32767.
pub fn parse_port(raw: &str) -> Result<u16, String> {
    let port: u16 = raw.parse().map_err(|e| format!("invalid port '{}': {}", raw, e))?;
    if port == 0 || port > 32767 {
        return Err(format!("port {} outside 1..=32767", port));
    }
    Ok(port)
}

/// Host name of this machine, used when no explicit identifier is configured.
pub fn local_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown-host".to_string())
}
