//! Wallet bridge: the request interface a wallet exposes to the portal
//!
//! The session depends on a wallet only through [`WalletBridge::request`],
//! mirroring the EIP-1193 provider API: account discovery, authorization
//! and contract access are all JSON-RPC requests. [`HttpBridge`] speaks
//! JSON-RPC 2.0 to a node whose accounts are unlocked (anvil, hardhat,
//! geth `--dev`), standing in for a browser-injected wallet.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::PortalConfig;
use crate::error::{WavePortalError, METHOD_NOT_FOUND_CODE};
use crate::Result;

#[async_trait]
pub trait WalletBridge: Send + Sync {
    /// Send a raw request and return its `result`
    async fn request(&self, method: &str, params: Value) -> Result<Value>;

    /// Accounts already authorized for this origin, without prompting
    async fn accounts(&self) -> Result<Vec<String>> {
        let value = self.request("eth_accounts", json!([])).await?;
        parse_accounts(value)
    }

    /// Ask the wallet to authorize an account (may prompt the user)
    async fn request_accounts(&self) -> Result<Vec<String>> {
        let value = self.request("eth_requestAccounts", json!([])).await?;
        parse_accounts(value)
    }

    /// Human-readable name for logs
    fn name(&self) -> &str {
        "wallet"
    }
}

fn parse_accounts(value: Value) -> Result<Vec<String>> {
    serde_json::from_value(value)
        .map_err(|e| WavePortalError::remote_call(format!("invalid account list: {}", e)))
}

/// Bridge configured for this process, if any
///
/// A bridge is present only when an RPC endpoint is configured; without one
/// the portal behaves like a browser with no wallet extension installed.
pub fn detect_bridge(config: &PortalConfig) -> Option<Arc<dyn WalletBridge>> {
    match &config.rpc_url {
        Some(url) => {
            log::info!("🔗 Wallet bridge: JSON-RPC at {}", url);
            Some(Arc::new(HttpBridge::new(url.clone())))
        }
        None => {
            log::warn!("⚠️  No wallet bridge configured (WAVE_PORTAL_RPC_URL unset)");
            None
        }
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// JSON-RPC 2.0 bridge over HTTP
pub struct HttpBridge {
    url: String,
    /// reqwest::Client is internally Arc-based
    client: reqwest::Client,
    next_id: AtomicU64,
}

impl HttpBridge {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl WalletBridge for HttpBridge {
    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        log::debug!("→ {} #{}", method, id);

        let response = self.client.post(&self.url).json(&body).send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        // Some endpoints pair a JSON-RPC error object with a non-2xx status
        let reply: RpcResponse = match serde_json::from_slice(&bytes) {
            Ok(reply) => reply,
            Err(_) if !status.is_success() => {
                return Err(WavePortalError::remote_call(format!(
                    "{} returned HTTP {}",
                    method, status
                )));
            }
            Err(e) => return Err(e.into()),
        };
        if let Some(error) = reply.error {
            return Err(WavePortalError::rpc(error.code, error.message));
        }
        if !status.is_success() {
            return Err(WavePortalError::remote_call(format!(
                "{} returned HTTP {}",
                method, status
            )));
        }
        Ok(reply.result.unwrap_or(Value::Null))
    }

    async fn request_accounts(&self) -> Result<Vec<String>> {
        match self.request("eth_requestAccounts", json!([])).await {
            Ok(value) => parse_accounts(value),
            // Dev nodes without a prompt treat unlocked accounts as authorized
            Err(WavePortalError::Rpc { code, .. }) if code == METHOD_NOT_FOUND_CODE => {
                log::debug!("eth_requestAccounts unsupported, falling back to eth_accounts");
                self.accounts().await
            }
            Err(e) => Err(e),
        }
    }

    fn name(&self) -> &str {
        &self.url
    }
}
