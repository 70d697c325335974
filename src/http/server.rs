//! Shared server plumbing.
//!
//! # Responsibilities
//! - Wrap routers in the common middleware stack (tracing, request timeout)
//! - Run a router on a listener until shutdown

use std::time::Duration;

use axum::http::StatusCode;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::lifecycle::Shutdown;

/// Upper bound on handling one request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Apply the middleware layers every fleet-probe server uses.
pub fn with_layers(router: Router) -> Router {
    router
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
}

/// Serve `router` on `listener` until `shutdown` fires.
pub async fn serve(listener: TcpListener, router: Router, shutdown: &Shutdown) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "HTTP server starting");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown.signalled())
        .await?;

    tracing::info!(address = %addr, "HTTP server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;

    #[tokio::test]
    async fn test_serve_stops_on_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Shutdown::new();
        let router = with_layers(Router::new().route("/", get(|| async { "up" })));

        let server = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { serve(listener, router, &shutdown).await })
        };

        let body = reqwest::get(format!("http://{}/", addr)).await.unwrap().text().await.unwrap();
        assert_eq!(body, "up");

        shutdown.trigger("test");
        assert!(server.await.unwrap().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_handler_gets_request_timeout() {
        use axum::body::Body;
        use axum::http::Request;
        use tower::ServiceExt;

        let router = with_layers(Router::new().route(
            "/slow",
            get(|| async {
                tokio::time::sleep(REQUEST_TIMEOUT * 2).await;
                "late"
            }),
        ));

        let response = router
            .oneshot(Request::builder().uri("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    }
}
