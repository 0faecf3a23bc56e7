//! HTTP server for the metrics endpoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use cisco_exporter_collector::{Orchestrator, Target};
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::exposition::Registry;

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    orchestrator: Orchestrator,
    targets: Arc<Vec<Target>>,
    metrics_path: Arc<str>,
}

/// Create the HTTP router.
pub fn create_router(orchestrator: Orchestrator, targets: Vec<Target>, metrics_path: &str) -> Router {
    let state = AppState {
        orchestrator,
        targets: Arc::new(targets),
        metrics_path: Arc::from(metrics_path),
    };

    Router::new()
        .route("/", get(index_handler))
        .route(metrics_path, get(metrics_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run one collection pass and render it.
pub async fn scrape(orchestrator: &Orchestrator, targets: &[Target]) -> String {
    let start = Instant::now();
    let mut registry = Registry::new();

    if let Err(e) = registry.register_all(orchestrator.descriptors()) {
        tracing::error!(error = %e, "Failed to register metric descriptors");
        return String::new();
    }

    let result = orchestrator.collect_all(targets).await;
    for sample in result.samples {
        if let Err(e) = registry.push(sample) {
            tracing::debug!(error = %e, "Sample dropped");
        }
    }

    tracing::debug!(
        targets = targets.len(),
        samples = registry.sample_count(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Scrape finished"
    );

    registry.render()
}

/// Handler for the metrics endpoint.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    let body = scrape(&state.orchestrator, &state.targets).await;

    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
        .into_response()
}

/// Landing page.
async fn index_handler(State(state): State<AppState>) -> Html<String> {
    Html(format!(
        "<html>\n<head><title>Cisco Exporter</title></head>\n<body>\n\
         <h1>Cisco Exporter</h1>\n<p><a href=\"{0}\">{0}</a></p>\n</body>\n</html>\n",
        state.metrics_path
    ))
}

/// Handler for the /health endpoint.
async fn health_handler() -> Response {
    (StatusCode::OK, "healthy\n").into_response()
}

/// HTTP server configuration.
pub struct HttpServer {
    orchestrator: Orchestrator,
    targets: Vec<Target>,
    listen_addr: SocketAddr,
    metrics_path: String,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(
        orchestrator: Orchestrator,
        targets: Vec<Target>,
        listen_addr: SocketAddr,
        metrics_path: String,
    ) -> Self {
        Self {
            orchestrator,
            targets,
            listen_addr,
            metrics_path,
        }
    }

    /// Run the HTTP server until the shutdown signal is received.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let router = create_router(self.orchestrator, self.targets, &self.metrics_path);

        let listener = tokio::net::TcpListener::bind(self.listen_addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", self.listen_addr, e))?;

        info!(
            addr = %self.listen_addr,
            path = %self.metrics_path,
            "HTTP server listening"
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                loop {
                    if shutdown.changed().await.is_err() {
                        break;
                    }
                    if *shutdown.borrow() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
            .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

        info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use cisco_exporter_collector::config::{CollectorConfig, SshConfig};
    use cisco_exporter_collector::mock::{MockConnector, MockDevice};
    use tower::ServiceExt;

    fn make_router(path: &str) -> Router {
        let config = CollectorConfig {
            ssh: SshConfig {
                password: Some("secret".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let connector = MockConnector::new().with_device("r1", MockDevice::ios());
        let orchestrator = Orchestrator::new(&config, Arc::new(connector));
        let targets = vec!["r1".parse().unwrap(), "r2".parse().unwrap()];
        create_router(orchestrator, targets, path)
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let router = make_router("/metrics");

        let response = router
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers().get("content-type").unwrap();
        assert!(content_type.to_str().unwrap().contains("text/plain"));

        let body = body_text(response).await;
        assert!(body.contains("# TYPE cisco_up gauge"));
        assert!(body.contains("cisco_up{target=\"r1\"} 1"));
        assert!(body.contains("cisco_up{target=\"r2\"} 0"));
        assert!(body.contains("cisco_facts_version{target=\"r1\",version=\"15.2(4)E10\"} 1"));
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let router = make_router("/metrics");

        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "healthy\n");
    }

    #[tokio::test]
    async fn test_index_links_metrics_path() {
        let router = make_router("/cisco/metrics");

        let response = router
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("href=\"/cisco/metrics\""));
    }

    #[tokio::test]
    async fn test_custom_metrics_path() {
        let router = make_router("/cisco/metrics");

        let response = router
            .clone()
            .oneshot(Request::get("/cisco/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
