//! The three downstream HTTP endpoints: `GET P/sse`,
//! `POST P/messages/`, `GET P/server_status`.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::aggregator::Aggregator;
use crate::error::INTERNAL_ERROR;
use crate::jsonrpc::{server_descriptor, JsonRpcRequest, JsonRpcResponse};
use crate::server::session::{SessionGuard, SessionTable};

/// Shared state reachable from every handler.
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub sessions: Arc<SessionTable>,
    pub path_prefix: String,
    pub name: String,
    pub description: String,
    pub started_at: SystemTime,
}

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    pub session_id: Option<String>,
}

/// `GET P/sse` — opens the stream, emits the `endpoint` event, then carries
/// JSON-RPC replies as `message` events until the client disconnects.
pub async fn sse_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (session_id, rx) = state.sessions.open().await;
    let endpoint = format!("{}/messages/?session_id={session_id}", state.path_prefix);

    let endpoint_event = futures::stream::once(async move {
        Ok::<_, Infallible>(Event::default().event("endpoint").data(endpoint))
    });
    let message_stream = UnboundedReceiverStream::new(rx).map(Ok::<_, Infallible>);
    let guard = SessionGuard::new(state.sessions.clone(), session_id);

    let stream = GuardedStream { inner: endpoint_event.chain(message_stream), _guard: guard };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("ping"))
}

/// Wraps a stream so the session is removed from the table the moment the
/// stream itself is dropped, regardless of why (client disconnect, server
/// shutdown aborting the response future).
struct GuardedStream<S> {
    inner: S,
    _guard: SessionGuard,
}

impl<S: Stream + Unpin> Stream for GuardedStream<S> {
    type Item = S::Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// `POST P/messages/?session_id=<id>` — always returns 202, the actual
/// reply (if any) goes out over the session's SSE stream.
pub async fn messages_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MessagesQuery>,
    body: String,
) -> impl IntoResponse {
    if let Some(session_id) = query.session_id {
        if let Ok(request) = serde_json::from_str::<JsonRpcRequest>(&body) {
            dispatch(&state, &session_id, request).await;
        }
    }

    (StatusCode::ACCEPTED, "Accepted")
}

async fn dispatch(state: &AppState, session_id: &str, request: JsonRpcRequest) {
    let Some(id) = request.id else {
        return;
    };

    let response = match request.method.as_str() {
        "initialize" => Some(JsonRpcResponse::success(id, server_descriptor())),
        "ping" => Some(JsonRpcResponse::success(id, serde_json::json!({}))),
        "tools/list" => {
            let tools = state.aggregator.tools().await;
            Some(JsonRpcResponse::success(id, serde_json::json!({ "tools": tools })))
        }
        "tools/call" => Some(handle_tools_call(state, id, request.params).await),
        _ => None,
    };

    if let Some(response) = response {
        if let Ok(payload) = serde_json::to_value(&response) {
            state.sessions.send(session_id, &payload).await;
        }
    }
}

async fn handle_tools_call(state: &AppState, id: Value, params: Option<Value>) -> JsonRpcResponse {
    let params = params.unwrap_or(Value::Null);
    match params.get("name").and_then(Value::as_str) {
        Some(alias) => {
            let result = state.aggregator.call(alias, params.clone()).await;
            JsonRpcResponse::success(id, result)
        }
        None => JsonRpcResponse::success(
            id,
            serde_json::json!({"error": {"code": INTERNAL_ERROR, "message": "missing params.name"}}),
        ),
    }
}

/// `GET P/server_status`.
pub async fn server_status_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let tools = state.aggregator.tools().await;
    let init_time = state.started_at.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
    let connection_cnt = state.sessions.count().await;

    Json(serde_json::json!({
        "name": state.name,
        "description": state.description,
        "init_time": init_time,
        "status": "ok",
        "connection_cnt": connection_cnt,
        "tools": tools,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dispatch_ignores_bare_notifications() {
        let state = AppState {
            aggregator: Arc::new(Aggregator::new()),
            sessions: Arc::new(SessionTable::new()),
            path_prefix: String::new(),
            name: "test".into(),
            description: String::new(),
            started_at: SystemTime::now(),
        };
        let (session_id, mut rx) = state.sessions.open().await;
        let notification = JsonRpcRequest::notification("notifications/cancelled", serde_json::json!({}));
        dispatch(&state, &session_id, notification).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn dispatch_tools_call_without_name_wraps_internal_error() {
        let state = AppState {
            aggregator: Arc::new(Aggregator::new()),
            sessions: Arc::new(SessionTable::new()),
            path_prefix: String::new(),
            name: "test".into(),
            description: String::new(),
            started_at: SystemTime::now(),
        };
        let response = handle_tools_call(&state, Value::from(1), Some(serde_json::json!({}))).await;
        let result = response.result.unwrap();
        assert_eq!(result["error"]["code"], INTERNAL_ERROR);
    }
}
