//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use fleet_probe::http::{self, distribution, origin};
use fleet_probe::lifecycle::Shutdown;

/// Start a programmable raw-TCP origin on an ephemeral port.
///
/// `f` receives the zero-based request number and returns status and body.
pub async fn start_programmable_origin<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(usize) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);
    let counter = Arc::new(AtomicUsize::new(0));

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    tokio::spawn(async move {
                        let mut buf = [0u8; 1024];
                        let _ = socket.read(&mut buf).await;

                        let (status, body) = f(n).await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// An advanced-mode origin answering with `tokens` in order, then repeating the last.
pub async fn start_token_origin(identifier: &'static str, tokens: Vec<&'static str>) -> SocketAddr {
    let tokens = Arc::new(tokens);
    start_programmable_origin(move |n| {
        let tokens = tokens.clone();
        async move {
            let token = tokens[n.min(tokens.len() - 1)];
            (200, origin_body(identifier, token, &chrono::Utc::now().to_rfc3339()))
        }
    })
    .await
}

/// Accepts connections but never answers.
pub async fn start_stalled_origin() -> SocketAddr {
    start_programmable_origin(|_| async {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        (200, String::new())
    })
    .await
}

/// A port nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Run the real origin responder on an ephemeral port.
pub async fn start_origin_responder(identifier: &str, shutdown: &Shutdown) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = origin::router(identifier);
    let shutdown = shutdown.clone();
    tokio::spawn(async move { http::serve(listener, router, &shutdown).await });
    addr
}

/// Run the real distribution service for `document` on an ephemeral port.
pub async fn start_distribution(document: distribution::ServedDocument, shutdown: &Shutdown) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = distribution::router(document);
    let shutdown = shutdown.clone();
    tokio::spawn(async move { http::serve(listener, router, &shutdown).await });
    addr
}

pub fn origin_body(identifier: &str, token: &str, server_time: &str) -> String {
    serde_json::json!({
        "identifier": identifier,
        "server_time": server_time,
        "token": token,
    })
    .to_string()
}

/// JSON origin entry for `addr`.
pub fn origin_json(addr: SocketAddr, mode: &str) -> String {
    format!(
        r#"{{"scheme": "http", "hostname": "{}", "port": {}, "mode": "{}"}}"#,
        addr.ip(),
        addr.port(),
        mode
    )
}

pub fn config_json(source_id: &str, timeout_secs: i64, origins: &[String]) -> String {
    format!(
        r#"{{"source_id": "{}", "timeout": {}, "interval": 1, "origins": [{}]}}"#,
        source_id,
        timeout_secs,
        origins.join(", ")
    )
}

pub fn write_config(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}
