//! Error types for the MCP proxy.
//!
//! Uses `thiserror` for structured error handling with automatic `From`
//! implementations, split by layer the way a client/tool split would be: one
//! type for the upstream transport/handshake, one for aggregator-level
//! routing.

use std::time::Duration;

/// Errors from an upstream transport or handshake.
#[derive(thiserror::Error, Debug)]
pub enum UpstreamError {
    /// The child process could not be spawned.
    #[error("failed to spawn upstream process: {0}")]
    Spawn(#[source] std::io::Error),

    /// Writing a frame to the transport failed.
    #[error("failed to write to upstream: {0}")]
    Write(#[source] std::io::Error),

    /// The SSE handshake with the upstream never produced an `endpoint` event.
    #[error("upstream SSE handshake failed: {0}")]
    SseHandshake(String),

    /// The upstream HTTP connection failed or was refused.
    #[error("upstream HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A request awaiting a response exceeded its deadline.
    #[error("timed out waiting for response after {0:?}")]
    Timeout(Duration),

    /// The transport was closed while a request was outstanding.
    #[error("upstream transport closed")]
    Closed,

    /// The upstream returned a JSON-RPC error object for a request.
    #[error("upstream returned error {code}: {message}")]
    RemoteError {
        /// JSON-RPC error code.
        code: i64,
        /// JSON-RPC error message.
        message: String,
    },

    /// The upstream's response could not be parsed into the expected shape.
    #[error("malformed upstream response: {0}")]
    Malformed(String),
}

/// Result type alias for upstream operations.
pub type UpstreamResult<T> = Result<T, UpstreamError>;

/// Errors surfaced while routing a downstream `tools/call`.
#[derive(thiserror::Error, Debug)]
pub enum AggregatorError {
    /// No alias in the current registry resolves to this name.
    #[error("Method {0} not found")]
    UnknownAlias(String),

    /// The named upstream could not be added (handshake or transport failure).
    #[error("upstream '{name}' failed to initialize: {source}")]
    UpstreamInit {
        /// Upstream name as given in configuration.
        name: String,
        /// Underlying cause.
        #[source]
        source: UpstreamError,
    },

    /// The call reached the upstream but it returned an error, or the
    /// round-trip itself failed.
    #[error("{0}")]
    CallFailed(#[from] UpstreamError),
}

/// Result type alias for aggregator operations.
pub type AggregatorResult<T> = Result<T, AggregatorError>;

/// JSON-RPC reserved error code: method not found.
pub const METHOD_NOT_FOUND: i64 = -32601;

/// JSON-RPC reserved error code: internal error.
pub const INTERNAL_ERROR: i64 = -32603;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregator_error_display_preserves_alias() {
        let err = AggregatorError::UnknownAlias("deadbeef00".to_string());
        assert_eq!(err.to_string(), "Method deadbeef00 not found");
    }
}
