//! JSON-RPC transport
//!
//! One client speaks both dialects in use here: the `version: "1.1"`
//! envelope bitcoind-family nodes expect, and the `jsonrpc: "2.0"`
//! envelope account-chain nodes expect. Node-reported errors become
//! [`Error::ChainRpc`], except for the one rejection the dispatch layer
//! reacts to, which is surfaced as [`Error::UnderpricedReplacement`].

use std::sync::atomic::{AtomicU64, Ordering};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use purser_core::{Error, Result};

/// Exact node message for a rejected same-nonce replacement
pub const UNDERPRICED_MESSAGE: &str = "replacement transaction underpriced";

/// Envelope dialect of the remote node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcFlavor {
    /// bitcoind-family `version: "1.1"` envelope
    Legacy,
    /// `jsonrpc: "2.0"` envelope
    V2,
}

#[derive(Debug, Deserialize)]
struct WireError {
    #[serde(default)]
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<WireError>,
}

/// JSON-RPC client for one node endpoint
pub struct JsonRpcClient {
    http: reqwest::Client,
    url: String,
    flavor: RpcFlavor,
    auth: Option<(String, String)>,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    /// Client for an unauthenticated endpoint
    pub fn new(url: impl Into<String>, flavor: RpcFlavor) -> Result<Self> {
        Self::build(url.into(), flavor, None)
    }

    /// Client for an endpoint behind HTTP basic auth
    pub fn with_basic_auth(
        url: impl Into<String>,
        flavor: RpcFlavor,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        Self::build(url.into(), flavor, Some((username.into(), password.into())))
    }

    fn build(url: String, flavor: RpcFlavor, auth: Option<(String, String)>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            url,
            flavor,
            auth,
            next_id: AtomicU64::new(1),
        })
    }

    /// Issue one call and deserialize the `result` field.
    ///
    /// `params` is passed through as-is and should be a JSON array, built
    /// with [`serde_json::json!`].
    pub async fn call<R: DeserializeOwned>(&self, method: &str, params: Value) -> Result<R> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = envelope(self.flavor, method, params, id);
        debug!(method, id, url = %self.url, "rpc call");

        let mut request = self.http.post(&self.url).json(&payload);
        if let Some((username, password)) = &self.auth {
            request = request.basic_auth(username, Some(password));
        }
        let response = request
            .send()
            .await
            .map_err(|e| Error::Network(format!("{} request failed: {}", method, e)))?;

        // bitcoind reports RPC errors with a 500 status and a normal JSON
        // body, so try the body before judging the status line.
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Network(format!("{} response unreadable: {}", method, e)))?;
        let wire: WireResponse = match serde_json::from_str(&body) {
            Ok(wire) => wire,
            Err(_) if !status.is_success() => {
                return Err(Error::Network(format!(
                    "{} returned HTTP {}",
                    method, status
                )));
            }
            Err(e) => {
                return Err(Error::Network(format!(
                    "Malformed response for {}: {}",
                    method, e
                )));
            }
        };

        let value = interpret(method, wire)?;
        serde_json::from_value(value).map_err(Error::from)
    }
}

/// Build the request envelope for one dialect
fn envelope(flavor: RpcFlavor, method: &str, params: Value, id: u64) -> Value {
    match flavor {
        RpcFlavor::Legacy => json!({
            "version": "1.1",
            "method": method,
            "params": params,
            "id": id,
        }),
        RpcFlavor::V2 => json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        }),
    }
}

/// Turn a parsed response into the result value or a mapped error
fn interpret(method: &str, wire: WireResponse) -> Result<Value> {
    if let Some(error) = wire.error {
        if error.message == UNDERPRICED_MESSAGE {
            return Err(Error::UnderpricedReplacement {
                attempts: 0,
                submitted: vec![],
            });
        }
        return Err(Error::ChainRpc {
            method: method.to_string(),
            message: error.message,
            raw: Some(json!({ "code": error.code, "data": error.data })),
        });
    }
    Ok(wire.result.unwrap_or(Value::Null))
}
