//! Upstream client: wraps a [`transport::Transport`], assigns request ids,
//! holds pending-response promises, and performs the MCP handshake.

pub mod transport;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{oneshot, Mutex, RwLock};

use crate::config::{protocol, UpstreamConfig};
use crate::error::{UpstreamError, UpstreamResult};
use crate::jsonrpc::{client_descriptor, JsonRpcRequest};
use transport::Transport;

/// A live connection to one upstream MCP server.
pub struct Upstream {
    name: String,
    transport: Mutex<Transport>,
    outbound: tokio::sync::mpsc::UnboundedSender<String>,
    next_id: AtomicI64,
    pending: Arc<Mutex<HashMap<i64, oneshot::Sender<crate::jsonrpc::InboundMessage>>>>,
    tools: RwLock<Vec<Value>>,
    handshake_complete: AtomicBool,
    reader_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl Upstream {
    /// Starts the transport and runs the handshake. On any
    /// failure the transport is closed and the error propagated — the
    /// caller (the aggregator) does not add this upstream.
    pub async fn connect(name: String, config: UpstreamConfig) -> UpstreamResult<Self> {
        let is_sse = matches!(config, UpstreamConfig::Sse { .. });
        let mut transport = Transport::new(&config);
        let handle = match transport.start().await {
            Ok(handle) => handle,
            Err(error) => {
                transport.close().await;
                return Err(error);
            }
        };

        let pending: Arc<Mutex<HashMap<i64, oneshot::Sender<crate::jsonrpc::InboundMessage>>>> =
            Arc::new(Mutex::new(HashMap::new()));
        let pending_for_task = pending.clone();
        let mut inbound = handle.inbound;
        let name_for_task = name.clone();

        let reader_task = tokio::spawn(async move {
            while let Some(msg) = inbound.recv().await {
                if msg.is_server_request() {
                    tracing::debug!(upstream = %name_for_task, "discarding upstream-initiated request");
                    continue;
                }
                let matched_id = msg.id.as_ref().and_then(Value::as_i64);
                let sender = match matched_id {
                    Some(id) => pending_for_task.lock().await.remove(&id),
                    None => None,
                };
                match sender {
                    Some(sender) => {
                        let _ = sender.send(msg);
                    }
                    None => {
                        tracing::debug!(upstream = %name_for_task, "notification or unmatched reply, ignoring");
                    }
                }
            }
        });

        let upstream = Self {
            name,
            transport: Mutex::new(transport),
            outbound: handle.outbound,
            next_id: AtomicI64::new(1),
            pending,
            tools: RwLock::new(Vec::new()),
            handshake_complete: AtomicBool::new(false),
            reader_task: Mutex::new(Some(reader_task)),
        };

        if let Err(error) = upstream.handshake(is_sse).await {
            upstream.close().await;
            return Err(error);
        }

        Ok(upstream)
    }

    /// `initialize` → `notifications/initialized` → `tools/list`.
    /// The `initialize` call is sent as a notification, not a request — a
    /// quirk preserved from the upstreams this proxy talks to — so no response is awaited
    /// for it.
    async fn handshake(&self, is_sse: bool) -> UpstreamResult<()> {
        self.notify(
            "initialize",
            serde_json::json!({
                "protocolVersion": protocol::PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": client_descriptor(),
            }),
        )
        .await?;

        self.notify("notifications/initialized", serde_json::json!({})).await?;

        let timeout =
            if is_sse { protocol::SSE_HANDSHAKE_TIMEOUT } else { protocol::STDIO_HANDSHAKE_TIMEOUT };
        let response = self.request("tools/list", serde_json::json!({}), timeout).await?;
        let tools = response
            .get("result")
            .and_then(|r| r.get("tools"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        *self.tools.write().await = tools;
        self.handshake_complete.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Sends a request expecting a response. Registers the pending entry
    /// before sending so a fast reply cannot race the insert.
    pub async fn request(&self, method: &str, params: Value, timeout: Duration) -> UpstreamResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let req = JsonRpcRequest::call(Value::from(id), method, params);
        let line = serde_json::to_string(&req).map_err(|e| UpstreamError::Malformed(e.to_string()))?;
        if self.outbound.send(line).is_err() {
            self.pending.lock().await.remove(&id);
            return Err(UpstreamError::Closed);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(msg)) => {
                if let Some(err) = msg.error {
                    return Err(UpstreamError::RemoteError { code: err.code, message: err.message });
                }
                Ok(serde_json::json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "result": msg.result.unwrap_or(Value::Null),
                }))
            }
            Ok(Err(_)) => Err(UpstreamError::Closed),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(UpstreamError::Timeout(timeout))
            }
        }
    }

    /// Sends a fire-and-forget notification (no `id`); returns immediately.
    pub async fn notify(&self, method: &str, params: Value) -> UpstreamResult<()> {
        let req = JsonRpcRequest::notification(method, params);
        let line = serde_json::to_string(&req).map_err(|e| UpstreamError::Malformed(e.to_string()))?;
        self.outbound.send(line).map_err(|_| UpstreamError::Closed)
    }

    /// The cached tool catalog, populated once during the handshake.
    pub async fn tools(&self) -> Vec<Value> {
        self.tools.read().await.clone()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.handshake_complete.load(Ordering::SeqCst)
    }

    /// Tears down the background reader and the transport. Idempotent.
    pub async fn close(&self) {
        if let Some(handle) = self.reader_task.lock().await.take() {
            handle.abort();
        }
        self.transport.lock().await.close().await;
    }
}
