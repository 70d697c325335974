//! Origin responder: answers leaf probes with a fresh token and the server time.

use std::net::SocketAddr;

use clap::Parser;
use tokio::net::TcpListener;

use fleet_probe::config::settings::{local_hostname, OriginSettings};
use fleet_probe::http::{origin, serve};
use fleet_probe::lifecycle::signals::listen_for_signals;
use fleet_probe::lifecycle::Shutdown;
use fleet_probe::observability::logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = OriginSettings::parse();
    logging::init(settings.log_format);

    let identifier = settings
        .identifier
        .filter(|id| !id.is_empty())
        .unwrap_or_else(local_hostname);

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(identifier = %identifier, address = %addr, "Origin responder listening");

    let shutdown = Shutdown::new();
    tokio::spawn(listen_for_signals(shutdown.clone()));

    serve(listener, origin::router(&identifier), &shutdown).await?;
    Ok(())
}
