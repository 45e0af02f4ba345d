//! Account-chain node client

use async_trait::async_trait;
use serde_json::json;

use purser_core::{amount, AccountNode, Address, Error, Result};

use crate::rpc::{JsonRpcClient, RpcFlavor};

/// JSON-RPC client for an account-chain node
pub struct EthNodeClient {
    rpc: JsonRpcClient,
}

impl EthNodeClient {
    /// Client for the node at `url`
    pub fn new(url: &str) -> Result<Self> {
        Ok(Self {
            rpc: JsonRpcClient::new(url, RpcFlavor::V2)?,
        })
    }
}

#[async_trait]
impl AccountNode for EthNodeClient {
    async fn balance(&self, address: &Address) -> Result<u128> {
        let raw: String = self
            .rpc
            .call("eth_getBalance", json!([address.as_str(), "latest"]))
            .await?;
        amount::parse_hex_quantity(&raw)
    }

    async fn pending_nonce(&self, address: &Address) -> Result<u64> {
        let raw: String = self
            .rpc
            .call(
                "eth_getTransactionCount",
                json!([address.as_str(), "pending"]),
            )
            .await?;
        let nonce = amount::parse_hex_quantity(&raw)?;
        u64::try_from(nonce)
            .map_err(|_| Error::InvalidAmount(format!("Nonce out of range: {}", raw)))
    }

    async fn has_code(&self, address: &Address) -> Result<bool> {
        let code: String = self
            .rpc
            .call("eth_getCode", json!([address.as_str(), "latest"]))
            .await?;
        // "0x" means no deployed code.
        Ok(code.len() > 3)
    }

    async fn call_readonly(&self, to: &Address, data: &str) -> Result<String> {
        self.rpc
            .call(
                "eth_call",
                json!([{ "to": to.as_str(), "data": data }, "latest"]),
            )
            .await
    }

    async fn broadcast(&self, raw_tx_hex: &str) -> Result<String> {
        self.rpc
            .call("eth_sendRawTransaction", json!([raw_tx_hex]))
            .await
    }
}
