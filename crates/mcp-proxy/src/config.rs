//! Configuration for the MCP aggregating proxy.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Protocol and timing constants fixed by the wire format.
pub mod protocol {
    use std::time::Duration;

    /// MCP protocol version echoed on `initialize` (no negotiation performed).
    pub const PROTOCOL_VERSION: &str = "2024-11-05";

    /// Name/version reported to upstreams as this proxy's `clientInfo`.
    pub const CLIENT_NAME: &str = "EzMCPCli";
    /// See [`CLIENT_NAME`].
    pub const CLIENT_VERSION: &str = "0.1.2";

    /// Name/version reported to downstream clients as `serverInfo`.
    pub const SERVER_NAME: &str = "mcpsrv";
    /// See [`SERVER_NAME`].
    pub const SERVER_VERSION: &str = "1.3.0";

    /// Default timeout for an upstream request that expects a response.
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

    /// `tools/list` timeout during handshake over an SSE upstream.
    pub const SSE_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

    /// `tools/list` timeout during handshake over a stdio upstream.
    pub const STDIO_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);
}

/// Configuration for one upstream MCP server, as supplied in an app's
/// `mcpServers` map. Chosen by the presence of `baseUrl`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UpstreamConfig {
    /// Connect over HTTP+SSE to an already-running MCP server.
    Sse {
        /// Base URL of the upstream's SSE endpoint (expected to be https).
        #[serde(rename = "baseUrl")]
        base_url: String,
    },
    /// Launch a child process and speak MCP over its stdio.
    Stdio {
        /// Executable to run.
        command: String,
        /// Arguments passed to the executable.
        #[serde(default)]
        args: Vec<String>,
        /// Extra environment variables for the child process.
        #[serde(default)]
        env: Option<HashMap<String, String>>,
    },
}

/// The `{"mcpServers": {...}}` document, as supplied by
/// the (out-of-scope) admin layer. This proxy reads it from a JSON file on
/// disk so it remains independently runnable and testable.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct McpServersDocument {
    /// Upstream name to its configuration.
    #[serde(rename = "mcpServers", default)]
    pub mcp_servers: HashMap<String, UpstreamConfig>,
}

/// Top-level proxy configuration: where to bind, what path prefix to mount
/// the MCP endpoints under, and which upstreams to aggregate.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP bind address.
    pub bind_addr: SocketAddr,
    /// Path prefix the three downstream endpoints are mounted under.
    pub path_prefix: String,
    /// Human-readable app name, reported by `server_status`.
    pub name: String,
    /// Human-readable app description, reported by `server_status`.
    pub description: String,
    /// Upstreams to aggregate.
    pub servers: HashMap<String, UpstreamConfig>,
}

impl AppConfig {
    /// Load the `mcpServers` document from a JSON file on disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not parse as the
    /// expected document shape.
    pub fn load_servers(path: &Path) -> anyhow::Result<McpServersDocument> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config {}: {e}", path.display()))?;
        let doc: McpServersDocument = serde_json::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("failed to parse config {}: {e}", path.display()))?;
        Ok(doc)
    }
}

/// Default request timeout applied when a caller of `Upstream::request`
/// doesn't specify one.
#[must_use]
pub const fn default_request_timeout() -> Duration {
    protocol::DEFAULT_REQUEST_TIMEOUT
}
