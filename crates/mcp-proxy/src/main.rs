//! MCP aggregating proxy - entry point.
//!
//! Loads an `mcpServers` configuration document, spins up one `Upstream`
//! per entry (skipping failures), and serves the merged catalog over
//! HTTP+SSE until shut down.

use std::net::SocketAddr;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use mcp_proxy::config::AppConfig;
use mcp_proxy::server::ProxyServer;

#[derive(Parser, Debug)]
#[command(name = "mcp-proxy")]
#[command(about = "Aggregating reverse proxy for the Model Context Protocol")]
#[command(version)]
struct Cli {
    /// Path to the `{"mcpServers": {...}}` configuration document.
    #[arg(long, env = "MCP_PROXY_CONFIG")]
    config: std::path::PathBuf,

    /// Path prefix the three downstream endpoints are mounted under.
    #[arg(long, default_value = "", env = "MCP_PROXY_PATH_PREFIX")]
    path_prefix: String,

    /// HTTP server port.
    #[arg(long, default_value = "8000", env = "PORT")]
    port: u16,

    /// Human-readable app name reported by `server_status`.
    #[arg(long, default_value = "mcp-proxy", env = "MCP_PROXY_NAME")]
    name: String,

    /// Human-readable app description reported by `server_status`.
    #[arg(long, default_value = "", env = "MCP_PROXY_DESCRIPTION")]
    description: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Output logs as JSON.
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        subscriber.with(tracing_subscriber::fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.json_logs);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), config = %cli.config.display(), "starting mcp-proxy");

    let document = AppConfig::load_servers(&cli.config)?;
    let bind_addr: SocketAddr = ([0, 0, 0, 0], cli.port).into();

    let config = AppConfig {
        bind_addr,
        path_prefix: cli.path_prefix,
        name: cli.name,
        description: cli.description,
        servers: document.mcp_servers,
    };

    let (server, failures) = ProxyServer::start(config).await;
    for (name, error) in &failures {
        tracing::warn!(upstream = %name, %error, "upstream failed to initialize");
    }

    let active = server.active_upstreams().await;
    if active == 0 {
        tracing::warn!("no upstreams are active; the supervisor decides whether that is fatal");
    }
    tracing::info!(active, failed = failures.len(), "upstreams initialized");

    server.serve(bind_addr).await
}
