//! Purser node transports and local signing
//!
//! This crate supplies the concrete collaborators the core engine is
//! generic over: JSON-RPC node clients for both dialects, HTTP fee
//! estimators, and an in-process signer with full key and transaction
//! serialization for every supported chain.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bitcoind;
pub mod ethnode;
pub mod fees;
pub mod keys;
pub mod rlp;
pub mod rpc;
pub mod signer;
pub mod tx;

pub use bitcoind::BitcoindClient;
pub use ethnode::EthNodeClient;
pub use fees::{BitcoinFeesEstimator, GasStationEstimator};
pub use rpc::{JsonRpcClient, RpcFlavor, UNDERPRICED_MESSAGE};
pub use signer::LocalSigner;
