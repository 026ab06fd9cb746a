use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::{NetworkType, WalletProvider, WalletTransaction};
use crate::errors::{PanelError, PanelResult};

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

/// Wallet provider backed by a node's JSON-RPC endpoint
///
/// The node (or a signer proxy in front of it) holds the keys; this type
/// only forwards `eth_accounts`, `net_version` and `eth_sendTransaction`.
/// The account list read by the connection check is handed to the next
/// `accounts` call, so one deposit costs a single `eth_accounts`.
#[derive(Debug)]
pub struct JsonRpcWallet {
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
    checked_accounts: Mutex<Option<Vec<String>>>,
}

impl JsonRpcWallet {
    pub fn new(url: &str, timeout: Option<Duration>) -> PanelResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| PanelError::Configuration(format!("wallet RPC client: {}", e)))?;
        Ok(Self {
            client,
            url: url.to_string(),
            next_id: AtomicU64::new(1),
            checked_accounts: Mutex::new(None),
        })
    }

    async fn fetch_accounts(&self) -> PanelResult<Vec<String>> {
        let value = self.call("eth_accounts", json!([])).await?;
        serde_json::from_value(value)
            .map_err(|e| PanelError::wallet("eth_accounts", e.to_string()))
    }

    async fn call(&self, method: &str, params: Value) -> PanelResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        tracing::debug!(method, id, url = %self.url, "Wallet RPC call");

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PanelError::wallet(method, e.to_string()))?;
        if !response.status().is_success() {
            return Err(PanelError::wallet(
                method,
                format!("HTTP {}", response.status().as_u16()),
            ));
        }

        let envelope: RpcEnvelope = response
            .json()
            .await
            .map_err(|e| PanelError::wallet(method, format!("malformed response: {}", e)))?;
        if let Some(err) = envelope.error {
            return Err(PanelError::wallet(
                method,
                format!("{} (code {})", err.message, err.code),
            ));
        }
        envelope
            .result
            .ok_or_else(|| PanelError::wallet(method, "response without result"))
    }
}

#[async_trait]
impl WalletProvider for JsonRpcWallet {
    async fn is_connected(&self) -> bool {
        match self.fetch_accounts().await {
            Ok(accounts) => {
                let connected = !accounts.is_empty();
                *self.checked_accounts.lock() = Some(accounts);
                connected
            }
            Err(e) => {
                tracing::debug!(error = %e, "Wallet connection check failed");
                false
            }
        }
    }

    async fn network_type(&self) -> PanelResult<NetworkType> {
        let value = self.call("net_version", json!([])).await?;
        let id = value
            .as_str()
            .and_then(|s| s.parse::<u64>().ok())
            .or_else(|| value.as_u64())
            .ok_or_else(|| PanelError::wallet("net_version", format!("unexpected id {}", value)))?;
        Ok(NetworkType::from_chain_id(id))
    }

    async fn accounts(&self) -> PanelResult<Vec<String>> {
        let checked = self.checked_accounts.lock().take();
        if let Some(accounts) = checked {
            return Ok(accounts);
        }
        self.fetch_accounts().await
    }

    async fn send_value(&self, tx: &WalletTransaction) -> PanelResult<String> {
        let params = json!([{
            "from": tx.from,
            "to": tx.to,
            "value": format!("0x{:x}", tx.value_wei),
        }]);
        let value = self.call("eth_sendTransaction", params).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| PanelError::wallet("eth_sendTransaction", "hash is not a string"))
    }
}
