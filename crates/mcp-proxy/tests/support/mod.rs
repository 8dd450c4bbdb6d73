//! Shared test fixtures. Not a test binary itself — included via `mod
//! support;` from the files that need it, following the usual convention
//! for shared integration-test scaffolding.

use std::collections::HashMap;

use mcp_proxy::config::UpstreamConfig;

/// Builds a stdio upstream config pointing at the `fake_stdio_upstream`
/// fixture binary (see `crates/mcp-proxy/src/bin/fake_stdio_upstream.rs`).
#[must_use]
pub fn fake_stdio_config(extra_args: &[&str]) -> UpstreamConfig {
    UpstreamConfig::Stdio {
        command: env!("CARGO_BIN_EXE_fake_stdio_upstream").to_string(),
        args: extra_args.iter().map(|s| (*s).to_string()).collect(),
        env: None,
    }
}

/// A single-tool fixture upstream named `tool_name`.
#[must_use]
pub fn fake_stdio_config_with_tool(tool_name: &str) -> UpstreamConfig {
    fake_stdio_config(&["--tool-name", tool_name])
}

/// `mcpServers`-shaped map with one fixture upstream.
#[must_use]
pub fn single_upstream_map(name: &str, tool_name: &str) -> HashMap<String, UpstreamConfig> {
    let mut servers = HashMap::new();
    servers.insert(name.to_string(), fake_stdio_config_with_tool(tool_name));
    servers
}
