//! Soteria node JSON-RPC client.
//!
//! The node speaks the bitcoind-style convention: POST a body with
//! `method` and `params`, receive `{"result": ..., "error": ...}`.
//! Every failure comes back as a [`FetchError`]; nothing escapes as a
//! panic or an `anyhow` error.

use anyhow::{Context, Result};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use crate::config::SourcesConfig;
use crate::types::{FetchError, Fetched};

const SOURCE_NAME: &str = "rpc";

/// The `{"result", "error"}` envelope returned by the node.
#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

pub struct NodeRpcClient {
    http: Client,
    url: String,
    hashrate_algo: String,
    user: Option<String>,
    password: Option<SecretString>,
}

impl NodeRpcClient {
    pub fn new(config: &SourcesConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .user_agent("soteria-stats/0.1.0")
            .build()
            .context("Failed to build HTTP client for node RPC")?;

        Ok(Self {
            http,
            url: config.rpc_url.clone(),
            hashrate_algo: config.hashrate_algo.clone(),
            user: config.rpc_user.clone(),
            password: config.rpc_password.clone(),
        })
    }

    /// Call `method` with positional `params` and return its `result`.
    pub async fn call(&self, method: &str, params: Vec<Value>) -> Fetched<Value> {
        let payload = json!({ "method": method, "params": params });
        debug!(method, url = %self.url, "RPC call");

        let mut request = self.http.post(&self.url).json(&payload);
        if let Some(user) = &self.user {
            let password = self.password.as_ref().map(|p| p.expose_secret().as_str());
            request = request.basic_auth(user, password);
        }

        let resp = match request.send().await {
            Ok(resp) => resp,
            Err(e) => {
                error!(method, error = %e, "Error making RPC call");
                return Err(FetchError::Transport {
                    source_name: SOURCE_NAME.to_string(),
                    message: e.to_string(),
                });
            }
        };

        let status = resp.status();
        if !status.is_success() {
            warn!(method, status = status.as_u16(), "RPC returned non-success status");
            return Err(FetchError::HttpStatus {
                source_name: SOURCE_NAME.to_string(),
                status: status.as_u16(),
            });
        }

        let body = match resp.text().await {
            Ok(body) => body,
            Err(e) => {
                error!(method, error = %e, "Failed to read RPC response body");
                return Err(FetchError::Transport {
                    source_name: SOURCE_NAME.to_string(),
                    message: e.to_string(),
                });
            }
        };

        let result = parse_envelope(method, &body);
        if let Err(e) = &result {
            warn!(method, error = %e, "RPC call produced no usable result");
        }
        result
    }

    pub async fn difficulty(&self) -> Fetched<Value> {
        self.call("getdifficulty", vec![json!(0)]).await
    }

    /// Network hashrate for the configured algorithm over the last block
    /// window (`-1` lets the node pick the window since the last
    /// difficulty change).
    pub async fn network_hashrate(&self) -> Fetched<Value> {
        self.call(
            "getnetworkhashps",
            vec![json!(0), json!(-1), json!(self.hashrate_algo)],
        )
        .await
    }

    pub async fn block_count(&self) -> Fetched<Value> {
        self.call("getblockcount", Vec::new()).await
    }
}

/// Extract `result` from a raw response body.
fn parse_envelope(method: &str, body: &str) -> Fetched<Value> {
    let envelope: RpcEnvelope =
        serde_json::from_str(body).map_err(|e| FetchError::MalformedResponse {
            source_name: SOURCE_NAME.to_string(),
            message: format!("{method}: {e}"),
        })?;

    if let Some(err) = envelope.error.filter(|e| !e.is_null()) {
        let message = err
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string());
        return Err(FetchError::Rpc { method: method.to_string(), message });
    }

    match envelope.result {
        Some(Value::Null) | None => Err(FetchError::Missing(method.to_string())),
        Some(value) => Ok(value),
    }
}
