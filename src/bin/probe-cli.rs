use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use fleet_probe::config::source::{fetch_client, ConfigSource};
use fleet_probe::config::validation::validate_origin;
use fleet_probe::config::{load_file, Config, OriginDocument};
use fleet_probe::probe::{HttpTransport, ProbeExecutor, ProbeOutcome, RoundContext, TokenCache};

#[derive(Parser)]
#[command(name = "probe-cli")]
#[command(about = "Operator CLI for fleet-probe", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a config document on disk
    Validate { path: PathBuf },
    /// Fetch and validate the document a distribution service serves
    Fetch {
        #[arg(default_value = "http://localhost:9300")]
        url: String,
    },
    /// Probe one origin the way a leaf would
    Probe {
        hostname: String,
        #[arg(short, long, default_value_t = 80)]
        port: i64,
        #[arg(short, long, default_value = "http")]
        scheme: String,
        /// simple or advanced
        #[arg(short, long, default_value = "advanced")]
        mode: String,
        #[arg(short, long, default_value_t = 10)]
        timeout_secs: u64,
        /// Consecutive probes; repeated tokens across them are reported
        #[arg(short, long, default_value_t = 1)]
        count: u32,
    },
    /// Dump the leaf_* series from a leaf's metrics endpoint
    Metrics {
        #[arg(default_value = "http://localhost:9299")]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { path } => {
            let config = load_file(&path)?;
            print_config(&config)?;
        }
        Commands::Fetch { url } => {
            let source = ConfigSource::remote(&url);
            let config = source.load(&fetch_client()?).await?;
            print_config(&config)?;
        }
        Commands::Probe {
            hostname,
            port,
            scheme,
            mode,
            timeout_secs,
            count,
        } => {
            let origin = validate_origin(&OriginDocument {
                scheme,
                hostname,
                port,
                mode: Some(mode),
            })?;
            let executor = ProbeExecutor::new(Arc::new(HttpTransport::new()?), TokenCache::new());
            let round = RoundContext {
                source_id: Arc::from("probe-cli"),
                timeout: Duration::from_secs(timeout_secs),
            };

            for attempt in 1..=count.max(1) {
                let report = match executor.probe(&origin, &round).await {
                    Ok(ProbeOutcome::Reachable) => json!({"attempt": attempt, "url": origin.derived_url, "result": "reachable"}),
                    Ok(ProbeOutcome::Fresh(sample)) => json!({
                        "attempt": attempt,
                        "url": origin.derived_url,
                        "result": "fresh",
                        "identifier": sample.identifier,
                        "latency_ms": sample.latency.as_millis() as u64,
                        "drift_secs": sample.drift_secs,
                    }),
                    Err(e) => json!({"attempt": attempt, "url": origin.derived_url, "result": e.reason(), "error": e.to_string()}),
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
        }
        Commands::Metrics { url } => {
            let res = reqwest::get(format!("{}/metrics", url.trim_end_matches('/'))).await?;
            let status = res.status();
            if !status.is_success() {
                eprintln!("Error: metrics endpoint returned status {}", status);
                return Ok(());
            }
            for line in res.text().await?.lines().filter(|l| l.starts_with("leaf_")) {
                println!("{}", line);
            }
        }
    }

    Ok(())
}

fn print_config(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let summary: Value = json!({
        "source_id": config.source_id,
        "timeout_secs": config.timeout.as_secs(),
        "interval_secs": config.interval.as_secs(),
        "origins": config
            .origins
            .iter()
            .map(|o| json!({"id": o.origin_id(), "mode": o.mode.as_str(), "url": o.derived_url}))
            .collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
