//! HTTP surface and lifecycle management for the aggregating proxy.
//!
//! [`ProxyServer`] owns the [`Aggregator`] and the downstream
//! [`SessionTable`] for one app, assembles the three-endpoint router, and
//! drives startup/shutdown. This proxy has exactly one transport surface
//! downstream (HTTP+SSE) — stdio is only ever an upstream-facing concern
//! here (`upstream::transport`).

pub mod handlers;
pub mod session;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::SystemTime;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::aggregator::Aggregator;
use crate::config::AppConfig;
use handlers::AppState;
use session::SessionTable;

/// One running instance of the proxy: the aggregator for this app's
/// upstreams, the downstream session table, and the bits of configuration
/// the HTTP handlers need (path prefix, name, description).
pub struct ProxyServer {
    state: Arc<AppState>,
}

impl ProxyServer {
    /// Startup: construct the aggregator, add every configured
    /// upstream sequentially, skipping failures but recording them. Zero
    /// active upstreams is not itself fatal here — the surrounding
    /// supervisor decides whether that's acceptable.
    pub async fn start(config: AppConfig) -> (Self, Vec<(String, crate::error::AggregatorError)>) {
        let aggregator = Arc::new(Aggregator::new());
        let mut failures = Vec::new();

        for (name, upstream_config) in config.servers {
            if let Err(error) = aggregator.add(name.clone(), upstream_config).await {
                tracing::warn!(upstream = %name, %error, "upstream failed to initialize, skipping");
                failures.push((name, error));
            }
        }

        let state = Arc::new(AppState {
            aggregator,
            sessions: Arc::new(SessionTable::new()),
            path_prefix: config.path_prefix,
            name: config.name,
            description: config.description,
            started_at: SystemTime::now(),
        });

        (Self { state }, failures)
    }

    /// Number of upstreams that completed their handshake successfully.
    pub async fn active_upstreams(&self) -> usize {
        self.state.aggregator.active_count().await
    }

    /// Assembles the router: the three downstream endpoints mounted under
    /// the configured path prefix, permissive CORS, and request tracing.
    #[must_use]
    pub fn router(&self) -> Router {
        let prefix = self.state.path_prefix.as_str();
        let sse_path = format!("{prefix}/sse");
        let messages_path = format!("{prefix}/messages/");
        let status_path = format!("{prefix}/server_status");

        Router::new()
            .route(&sse_path, get(handlers::sse_handler).options(preflight))
            .route(&messages_path, axum::routing::post(handlers::messages_handler).options(preflight))
            .route(&status_path, get(handlers::server_status_handler).options(preflight))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Binds and serves until the process receives a shutdown signal, then
    /// tears down every upstream.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot bind or the server fails.
    pub async fn serve(&self, addr: SocketAddr) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(%addr, "proxy listening");
        axum::serve(listener, self.router()).with_graceful_shutdown(shutdown_signal()).await?;
        self.shutdown().await;
        Ok(())
    }

    /// Tears down every upstream. Any still-open SSE stream is aborted when
    /// the process exits; its `SessionGuard` removes the session on drop.
    pub async fn shutdown(&self) {
        self.state.aggregator.shutdown().await;
    }
}

async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.expect("failed to install CTRL+C handler");
    tracing::info!("received shutdown signal");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UpstreamConfig;
    use std::collections::HashMap;

    #[tokio::test]
    async fn start_with_no_upstreams_has_no_failures() {
        let config = AppConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            path_prefix: String::new(),
            name: "test-app".to_string(),
            description: String::new(),
            servers: HashMap::new(),
        };
        let (server, failures) = ProxyServer::start(config).await;
        assert!(failures.is_empty());
        assert_eq!(server.active_upstreams().await, 0);
    }

    #[tokio::test]
    async fn start_records_failure_for_unspawnable_command() {
        let mut servers = HashMap::new();
        servers.insert(
            "broken".to_string(),
            UpstreamConfig::Stdio {
                command: "/nonexistent/definitely-not-a-binary".to_string(),
                args: vec![],
                env: None,
            },
        );
        let config = AppConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            path_prefix: String::new(),
            name: "test-app".to_string(),
            description: String::new(),
            servers,
        };
        let (server, failures) = ProxyServer::start(config).await;
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "broken");
        assert_eq!(server.active_upstreams().await, 0);
    }
}
