//! Aggregator: owns one app's set of named upstreams, produces the merged
//! tool catalog under opaque aliases, and routes `tools/call` by alias.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use rand::Rng;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::config::{protocol, UpstreamConfig};
use crate::error::{AggregatorError, AggregatorResult, INTERNAL_ERROR, METHOD_NOT_FOUND};
use crate::upstream::Upstream;

/// One entry in the alias registry: the upstream that owns the tool and its
/// name before aliasing.
struct AliasEntry {
    upstream: String,
    original_name: String,
}

/// Owns every active upstream for one app and the alias registry that glues
/// the merged downstream catalog back to them.
pub struct Aggregator {
    upstreams: RwLock<HashMap<String, Arc<Upstream>>>,
    registry: RwLock<HashMap<String, AliasEntry>>,
}

impl Aggregator {
    #[must_use]
    pub fn new() -> Self {
        Self { upstreams: RwLock::new(HashMap::new()), registry: RwLock::new(HashMap::new()) }
    }

    /// Constructs and initializes an upstream. On failure the upstream is
    /// not added and the error is propagated to the caller — the
    /// lifecycle manager decides whether to treat this as fatal.
    pub async fn add(&self, name: String, config: UpstreamConfig) -> AggregatorResult<()> {
        let upstream = Upstream::connect(name.clone(), config)
            .await
            .map_err(|source| AggregatorError::UpstreamInit { name: name.clone(), source })?;
        self.upstreams.write().await.insert(name, Arc::new(upstream));
        Ok(())
    }

    /// Rebuilds the alias registry from scratch and returns the merged
    /// catalog. Aliases from any previous call become invalid the instant
    /// this returns — the registry is replaced as a single
    /// reference so readers never observe a torn state.
    pub async fn tools(&self) -> Vec<Value> {
        let snapshot: Vec<(String, Arc<Upstream>)> = {
            let upstreams = self.upstreams.read().await;
            upstreams.iter().map(|(name, upstream)| (name.clone(), upstream.clone())).collect()
        };

        let mut new_registry = HashMap::new();
        let mut merged = Vec::new();
        let mut rng = rand::thread_rng();

        for (upstream_name, upstream) in snapshot {
            if !upstream.is_ready() {
                continue;
            }
            for tool in upstream.tools().await {
                let Some(original_name) = tool.get("name").and_then(Value::as_str).map(str::to_owned)
                else {
                    continue;
                };

                let alias = loop {
                    let candidate = generate_alias(&mut rng);
                    if !new_registry.contains_key(&candidate) {
                        break candidate;
                    }
                };

                let mut exported = tool.clone();
                if let Some(obj) = exported.as_object_mut() {
                    obj.insert("name".to_string(), Value::String(alias.clone()));
                }

                new_registry
                    .insert(alias, AliasEntry { upstream: upstream_name.clone(), original_name });
                merged.push(exported);
            }
        }

        *self.registry.write().await = new_registry;
        merged
    }

    /// Resolves `alias` against the *current* registry and routes the call.
    /// Returns the value to embed as `result` downstream — a propagated
    /// upstream result on success, or `{"error": {...}}` on alias miss or
    /// internal failure.
    pub async fn call(&self, alias: &str, params: Value) -> Value {
        let resolved = {
            let registry = self.registry.read().await;
            registry.get(alias).map(|entry| (entry.upstream.clone(), entry.original_name.clone()))
        };

        let Some((upstream_name, original_name)) = resolved else {
            return error_result(METHOD_NOT_FOUND, AggregatorError::UnknownAlias(alias.to_string()));
        };

        let upstream = {
            let upstreams = self.upstreams.read().await;
            upstreams.get(&upstream_name).cloned()
        };
        let Some(upstream) = upstream else {
            return error_result(
                INTERNAL_ERROR,
                format!("upstream '{upstream_name}' is no longer active"),
            );
        };

        let mut call_params = params;
        if let Some(obj) = call_params.as_object_mut() {
            obj.insert("name".to_string(), Value::String(original_name));
        }

        match upstream.request("tools/call", call_params, protocol::DEFAULT_REQUEST_TIMEOUT).await {
            Ok(response) => response.get("result").cloned().unwrap_or(Value::Null),
            Err(error) => error_result(INTERNAL_ERROR, error),
        }
    }

    /// Closes and removes every upstream.
    pub async fn shutdown(&self) {
        let mut upstreams = self.upstreams.write().await;
        for (_, upstream) in upstreams.drain() {
            upstream.close().await;
        }
        self.registry.write().await.clear();
    }

    /// Number of currently active upstreams, for `server_status`-adjacent
    /// diagnostics and lifecycle start-up reporting.
    pub async fn active_count(&self) -> usize {
        self.upstreams.read().await.len()
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

fn error_result(code: i64, message: impl std::fmt::Display) -> Value {
    serde_json::json!({"error": {"code": code, "message": message.to_string()}})
}

/// 5 random bytes, hex-encoded — 10 hex characters, ≈40 bits of entropy.
fn generate_alias(rng: &mut impl Rng) -> String {
    let bytes: [u8; 5] = rng.gen();
    bytes.iter().fold(String::with_capacity(10), |mut acc, byte| {
        let _ = write!(acc, "{byte:02x}");
        acc
    })
}
