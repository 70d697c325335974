//! Config distribution service: validates one document at startup and serves
//! it to leaves at `GET /config`.

use std::net::SocketAddr;

use clap::Parser;
use tokio::net::TcpListener;

use fleet_probe::config::settings::DistributionSettings;
use fleet_probe::http::distribution::{self, ServedDocument};
use fleet_probe::http::serve;
use fleet_probe::lifecycle::signals::listen_for_signals;
use fleet_probe::lifecycle::Shutdown;
use fleet_probe::observability::logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = DistributionSettings::parse();
    logging::init(settings.log_format);

    let (document, config) = ServedDocument::from_file(&settings.config).map_err(|e| {
        tracing::error!(path = %settings.config.display(), error = %e, "Refusing to serve invalid config");
        e
    })?;

    tracing::info!(
        path = %settings.config.display(),
        source_id = %config.source_id,
        origins = config.origins.len(),
        format = ?document.format(),
        "Config validated"
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    let listener = TcpListener::bind(addr).await?;

    let shutdown = Shutdown::new();
    tokio::spawn(listen_for_signals(shutdown.clone()));

    serve(listener, distribution::router(document), &shutdown).await?;
    Ok(())
}
