//! Aggregating reverse proxy for the Model Context Protocol.
//!
//! Bundles several upstream MCP servers — each reached over child-process
//! stdio or HTTP+SSE — behind a single downstream MCP endpoint. Tools from
//! every upstream are merged under opaque, collision-free aliases; a
//! downstream `tools/call` is routed back to whichever upstream originally
//! advertised the aliased tool.
//!
//! # Example
//!
//! ```no_run
//! use mcp_proxy::config::AppConfig;
//! use mcp_proxy::server::ProxyServer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let document = AppConfig::load_servers("mcp-proxy.json".as_ref())?;
//!     let bind_addr = "0.0.0.0:8000".parse()?;
//!     let config = AppConfig {
//!         bind_addr,
//!         path_prefix: String::new(),
//!         name: "my-app".to_string(),
//!         description: String::new(),
//!         servers: document.mcp_servers,
//!     };
//!     let (server, failures) = ProxyServer::start(config).await;
//!     for (name, error) in &failures {
//!         eprintln!("upstream {name} failed to start: {error}");
//!     }
//!     server.serve(bind_addr).await
//! }
//! ```

pub mod aggregator;
pub mod config;
pub mod error;
pub mod jsonrpc;
pub mod server;
pub mod upstream;

pub use aggregator::Aggregator;
pub use config::{AppConfig, UpstreamConfig};
pub use error::{AggregatorError, UpstreamError};
pub use server::ProxyServer;
pub use upstream::Upstream;
