//! Fuzzing library for mcp-proxy.
//!
//! Re-exports the wire-format types that sit directly on a trust boundary —
//! JSON-RPC envelopes arriving over stdio/SSE from an upstream, and over
//! HTTP from a downstream client — so the fuzz targets can drive them with
//! arbitrary bytes.
//!
//! # Usage
//!
//! ```bash
//! cd crates/proxy-fuzz
//! cargo +nightly fuzz run fuzz_jsonrpc_request -- -max_total_time=60
//! ```

pub use mcp_proxy::jsonrpc;
