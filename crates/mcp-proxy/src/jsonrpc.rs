//! JSON-RPC 2.0 wire types shared by the upstream and downstream directions,
//! plus the fixed protocol descriptors.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::protocol;

/// A JSON-RPC 2.0 request or notification. `id` is `None` for notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: JsonRpcVersion,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Build a request expecting a response.
    #[must_use]
    pub fn call(id: Value, method: impl Into<String>, params: Value) -> Self {
        Self { jsonrpc: JsonRpcVersion, id: Some(id), method: method.into(), params: Some(params) }
    }

    /// Build a fire-and-forget notification (no `id`).
    #[must_use]
    pub fn notification(method: impl Into<String>, params: Value) -> Self {
        Self { jsonrpc: JsonRpcVersion, id: None, method: method.into(), params: Some(params) }
    }
}

/// A JSON-RPC 2.0 response: exactly one of `result`/`error` is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: JsonRpcVersion,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    #[must_use]
    pub fn success(id: Value, result: Value) -> Self {
        Self { jsonrpc: JsonRpcVersion, id, result: Some(result), error: None }
    }

    #[must_use]
    pub fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            id,
            result: None,
            error: Some(JsonRpcError { code, message: message.into(), data: None }),
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Zero-sized marker that always (de)serializes as the literal `"2.0"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonRpcVersion;

impl Serialize for JsonRpcVersion {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("2.0")
    }
}

impl<'de> Deserialize<'de> for JsonRpcVersion {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s == "2.0" {
            Ok(Self)
        } else {
            Err(serde::de::Error::custom(format!("unsupported jsonrpc version: {s}")))
        }
    }
}

/// An inbound message whose shape (request, notification, or response) is
/// not yet known. Upstream transports decode into this first, then the
/// `Upstream` inbound loop classifies it.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

impl InboundMessage {
    /// True if this message carries an `id` that could match a pending
    /// request (the inbound rule is unified across both transports —
    /// `id`-presence plus a pending-map match is a strictly safer condition).
    #[must_use]
    pub fn has_id(&self) -> bool {
        self.id.is_some()
    }

    /// True if this looks like an upstream-initiated request (has both an
    /// `id` and a `method`) rather than a response. The design discards
    /// these — server-initiated requests aren't supported.
    #[must_use]
    pub fn is_server_request(&self) -> bool {
        self.id.is_some() && self.method.is_some()
    }
}

/// Builds the fixed `initialize` server descriptor returned to downstream
/// clients.
#[must_use]
pub fn server_descriptor() -> Value {
    serde_json::json!({
        "protocolVersion": protocol::PROTOCOL_VERSION,
        "capabilities": {
            "experimental": {},
            "prompts": {"listChanged": false},
            "resources": {"subscribe": false, "listChanged": false},
            "tools": {"listChanged": false}
        },
        "serverInfo": {
            "name": protocol::SERVER_NAME,
            "version": protocol::SERVER_VERSION
        }
    })
}

/// Builds the fixed client descriptor this proxy presents to upstreams on
/// `initialize`.
#[must_use]
pub fn client_descriptor() -> Value {
    serde_json::json!({
        "name": protocol::CLIENT_NAME,
        "version": protocol::CLIENT_VERSION
    })
}
