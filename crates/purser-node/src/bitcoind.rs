//! bitcoind-family node client

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use purser_core::{amount, Address, Result, Unspent, UtxoNode};
use purser_params::Currency;

use crate::rpc::{JsonRpcClient, RpcFlavor};

/// Upper confirmation bound passed to listunspent
const MAX_CONFIRMATIONS: u32 = 9_999_999;

#[derive(Debug, Deserialize)]
struct UnspentEntry {
    txid: String,
    vout: u32,
    amount: Decimal,
    confirmations: u64,
    #[serde(rename = "scriptPubKey", default)]
    script_pub_key: String,
}

/// JSON-RPC client for a bitcoind-family node.
///
/// Works for Bitcoin, Litecoin, and Bitcoin Cash nodes, which all speak
/// the same wallet RPC surface used here.
pub struct BitcoindClient {
    rpc: JsonRpcClient,
    currency: Currency,
}

impl BitcoindClient {
    /// Client for `currency` at `url`, authenticating with HTTP basic auth
    pub fn new(currency: Currency, url: &str, username: &str, password: &str) -> Result<Self> {
        Ok(Self {
            rpc: JsonRpcClient::with_basic_auth(url, RpcFlavor::Legacy, username, password)?,
            currency,
        })
    }
}

#[async_trait]
impl UtxoNode for BitcoindClient {
    async fn list_unspent(
        &self,
        address: &Address,
        min_confirmations: u32,
    ) -> Result<Vec<Unspent>> {
        let entries: Vec<UnspentEntry> = self
            .rpc
            .call(
                "listunspent",
                json!([min_confirmations, MAX_CONFIRMATIONS, [address.as_str()]]),
            )
            .await?;
        debug!(
            currency = %self.currency,
            address = address.as_str(),
            outputs = entries.len(),
            "listed unspent outputs"
        );
        let decimals = self.currency.decimals();
        entries
            .into_iter()
            .map(|entry| {
                Ok(Unspent {
                    txid: entry.txid,
                    vout: entry.vout,
                    amount: amount::to_base_units(entry.amount, decimals)?,
                    confirmations: entry.confirmations,
                    script_pubkey: entry.script_pub_key,
                })
            })
            .collect()
    }

    async fn broadcast(&self, raw_tx_hex: &str) -> Result<String> {
        self.rpc
            .call("sendrawtransaction", json!([raw_tx_hex]))
            .await
    }

    async fn import_watch_only(&self, address: &Address) -> Result<()> {
        // Empty label, no rescan: fresh addresses have no history.
        let _: serde_json::Value = self
            .rpc
            .call("importaddress", json!([address.as_str(), "", false]))
            .await?;
        debug!(
            currency = %self.currency,
            address = address.as_str(),
            "imported watch-only address"
        );
        Ok(())
    }
}
