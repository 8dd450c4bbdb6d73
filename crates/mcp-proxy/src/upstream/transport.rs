//! Transport adapters: child-process stdio and HTTP+SSE.
//!
//! Both variants are pure frame movers: they make no assumption about
//! request/response pairing, that correlation lives one layer up in
//! [`crate::upstream::Upstream`].

use std::process::Stdio as ProcStdio;
use std::sync::Arc;

use eventsource_stream::Eventsource;
use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, Mutex};
use url::Url;

use crate::config::UpstreamConfig;
use crate::error::{UpstreamError, UpstreamResult};
use crate::jsonrpc::InboundMessage;

/// Everything a started transport hands back to its owning [`Upstream`]:
/// a sender for outbound frames and a receiver for decoded inbound messages.
///
/// [`Upstream`]: crate::upstream::Upstream
pub struct TransportHandle {
    pub outbound: mpsc::UnboundedSender<String>,
    pub inbound: mpsc::UnboundedReceiver<InboundMessage>,
}

/// A transport, not yet or already started.
pub enum Transport {
    Stdio(StdioTransport),
    Sse(SseTransport),
}

impl Transport {
    #[must_use]
    pub fn new(config: &UpstreamConfig) -> Self {
        match config {
            UpstreamConfig::Stdio { command, args, env } => {
                Self::Stdio(StdioTransport::new(command.clone(), args.clone(), env.clone()))
            }
            UpstreamConfig::Sse { base_url } => Self::Sse(SseTransport::new(base_url.clone())),
        }
    }

    /// Opens the transport. Resolves once the channel is usable for
    /// `initialize` (for SSE, that means the `endpoint` event has arrived).
    pub async fn start(&mut self) -> UpstreamResult<TransportHandle> {
        match self {
            Self::Stdio(t) => t.start().await,
            Self::Sse(t) => t.start().await,
        }
    }

    /// Releases OS resources. Never awaited for completion by the caller.
    pub async fn close(&self) {
        match self {
            Self::Stdio(t) => t.close().await,
            Self::Sse(t) => t.close().await,
        }
    }
}

/// Launches the configured child and frames newline-delimited JSON on its
/// standard streams.
pub struct StdioTransport {
    command: String,
    args: Vec<String>,
    env: Option<std::collections::HashMap<String, String>>,
    child: Option<Arc<Mutex<Child>>>,
}

impl StdioTransport {
    #[must_use]
    pub fn new(
        command: String,
        args: Vec<String>,
        env: Option<std::collections::HashMap<String, String>>,
    ) -> Self {
        Self { command, args, env, child: None }
    }

    pub async fn start(&mut self) -> UpstreamResult<TransportHandle> {
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args)
            .stdin(ProcStdio::piped())
            .stdout(ProcStdio::piped())
            .stderr(ProcStdio::piped())
            .kill_on_drop(true);
        if let Some(env) = &self.env {
            cmd.envs(env);
        }

        let mut child = cmd.spawn().map_err(UpstreamError::Spawn)?;
        let mut stdin = child.stdin.take().expect("piped stdin");
        let stdout = child.stdout.take().expect("piped stdout");
        let stderr = child.stderr.take().expect("piped stderr");

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<InboundMessage>();

        // One task owns stdin, so concurrent `send` calls can never interleave.
        tokio::spawn(async move {
            while let Some(line) = outbound_rx.recv().await {
                if stdin.write_all(line.as_bytes()).await.is_err() {
                    break;
                }
                if stdin.write_all(b"\n").await.is_err() {
                    break;
                }
            }
        });

        tokio::spawn(async move {
            let mut reader = BufReader::new(stdout);
            let mut raw = Vec::new();
            loop {
                raw.clear();
                match reader.read_until(b'\n', &mut raw).await {
                    Ok(0) => break,
                    Ok(_) if raw.last() != Some(&b'\n') => {
                        // EOF reached mid-line: a partial line with no trailing
                        // newline is discarded rather than parsed.
                        break;
                    }
                    Ok(_) => {
                        let line = raw.strip_suffix(b"\n").unwrap_or(&raw);
                        let line = line.strip_suffix(b"\r").unwrap_or(line);
                        if line.iter().all(u8::is_ascii_whitespace) {
                            continue;
                        }
                        match serde_json::from_slice::<InboundMessage>(line) {
                            Ok(msg) => {
                                if inbound_tx.send(msg).is_err() {
                                    break;
                                }
                            }
                            Err(error) => {
                                tracing::warn!(%error, "discarding malformed stdio frame");
                            }
                        }
                    }
                    Err(error) => {
                        tracing::warn!(%error, "stdio read error, closing inbound loop");
                        break;
                    }
                }
            }
        });

        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                tracing::debug!(target: "upstream.stderr", "{line}");
            }
        });

        self.child = Some(Arc::new(Mutex::new(child)));
        Ok(TransportHandle { outbound: outbound_tx, inbound: inbound_rx })
    }

    pub async fn close(&self) {
        if let Some(child) = &self.child {
            let mut child = child.lock().await;
            let _ = child.start_kill();
        }
    }
}

/// Opens a long-lived GET to the configured base URL and consumes the
/// response as an SSE stream, POSTing outbound frames to the post-back URL
/// advertised by the upstream's `endpoint` event.
pub struct SseTransport {
    base_url: String,
    client: reqwest::Client,
    task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl SseTransport {
    #[must_use]
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(None)
            .build()
            .expect("reqwest client builds with static config");
        Self { base_url, client, task: Mutex::new(None) }
    }

    pub async fn start(&mut self) -> UpstreamResult<TransportHandle> {
        let base = Url::parse(&self.base_url)
            .map_err(|error| UpstreamError::SseHandshake(format!("invalid base url: {error}")))?;

        let response = self.client.get(base.clone()).send().await?;
        let mut stream = response.bytes_stream().eventsource();

        let (endpoint_tx, endpoint_rx) = oneshot::channel::<()>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<InboundMessage>();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();

        let client = self.client.clone();
        let handle = tokio::spawn(async move {
            let mut endpoint_tx = Some(endpoint_tx);
            let mut post_back: Option<Url> = None;
            loop {
                tokio::select! {
                    biased;
                    item = stream.next() => {
                        match item {
                            Some(Ok(event)) => {
                                if event.event == "endpoint" {
                                    match base.join(event.data.trim()) {
                                        Ok(url) => {
                                            post_back = Some(url);
                                            if let Some(tx) = endpoint_tx.take() {
                                                let _ = tx.send(());
                                            }
                                        }
                                        Err(error) => {
                                            tracing::warn!(%error, "upstream sent unresolvable endpoint url");
                                        }
                                    }
                                } else {
                                    match serde_json::from_str::<InboundMessage>(event.data.trim()) {
                                        Ok(msg) => {
                                            if inbound_tx.send(msg).is_err() {
                                                break;
                                            }
                                        }
                                        Err(error) => {
                                            tracing::warn!(%error, "discarding malformed sse frame");
                                        }
                                    }
                                }
                            }
                            Some(Err(error)) => {
                                tracing::warn!(%error, "sse stream error, closing inbound loop");
                                break;
                            }
                            None => break,
                        }
                    }
                    Some(line) = outbound_rx.recv() => {
                        match &post_back {
                            Some(url) => {
                                if let Err(error) = client.post(url.clone()).body(line).send().await {
                                    tracing::warn!(%error, "sse post-back failed");
                                }
                            }
                            None => {
                                tracing::warn!("dropping outbound frame sent before endpoint event arrived");
                            }
                        }
                    }
                    else => break,
                }
            }
        });

        *self.task.lock().await = Some(handle);

        endpoint_rx
            .await
            .map_err(|_| UpstreamError::SseHandshake("stream closed before endpoint event".to_string()))?;

        Ok(TransportHandle { outbound: outbound_tx, inbound: inbound_rx })
    }

    pub async fn close(&self) {
        if let Some(handle) = self.task.lock().await.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_endpoint_resolves_against_base() {
        let base = Url::parse("https://u.example/mcp").unwrap();
        let resolved = base.join("/msg?s=abc").unwrap();
        assert_eq!(resolved.as_str(), "https://u.example/msg?s=abc");
    }

    #[test]
    fn absolute_endpoint_is_kept_verbatim() {
        let base = Url::parse("https://u.example/mcp").unwrap();
        let resolved = base.join("https://other.example/msg?s=abc").unwrap();
        assert_eq!(resolved.as_str(), "https://other.example/msg?s=abc");
    }
}
