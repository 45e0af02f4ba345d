//! Node collaborator interfaces
//!
//! Builders never speak a wire protocol themselves. They work against these
//! traits, and the transport crate supplies JSON-RPC backed implementations.

use async_trait::async_trait;

use crate::address::Address;
use crate::utxo::Unspent;
use crate::Result;

/// Node operations a UTXO chain needs
#[async_trait]
pub trait UtxoNode: Send + Sync {
    /// List spendable outputs for an address with at least
    /// `min_confirmations` confirmations
    async fn list_unspent(&self, address: &Address, min_confirmations: u32) -> Result<Vec<Unspent>>;

    /// Broadcast a signed raw transaction, returning the transaction id
    async fn broadcast(&self, raw_tx_hex: &str) -> Result<String>;

    /// Register an address with the node as watch-only, without rescanning,
    /// so its outputs show up in unspent listings
    async fn import_watch_only(&self, address: &Address) -> Result<()>;
}

/// Node operations an account chain needs
#[async_trait]
pub trait AccountNode: Send + Sync {
    /// Confirmed balance in smallest units
    async fn balance(&self, address: &Address) -> Result<u128>;

    /// Next nonce for the address, counting pending transactions
    async fn pending_nonce(&self, address: &Address) -> Result<u64>;

    /// Whether the address has deployed code
    async fn has_code(&self, address: &Address) -> Result<bool>;

    /// Execute a read-only contract call and return the raw hex result
    async fn call_readonly(&self, to: &Address, data: &str) -> Result<String>;

    /// Broadcast a signed raw transaction, returning the transaction hash.
    ///
    /// Implementations must surface the node's underpriced-replacement
    /// rejection as [`crate::Error::UnderpricedReplacement`] so the account
    /// builder can drive its nonce-bump retry.
    async fn broadcast(&self, raw_tx_hex: &str) -> Result<String>;
}
