//! Purser chain parameters and constants
//!
//! This crate provides the currency enumeration and per-chain constants:
//! address version bytes, human-readable prefixes, WIF prefixes, fee
//! ceilings, gas limits, and decimal scales for every supported chain.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod currency;
pub mod network;

pub use currency::Currency;
pub use network::{
    ChainParams, NetworkType, GAS_CONTRACT_CALL, GAS_PLAIN_TRANSFER, GAS_TOKEN_TRANSFER,
};

/// Error types for parameter operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Currency symbol not known to this build
    #[error("Unknown currency symbol: {0}")]
    UnknownSymbol(String),

    /// Network name not recognized
    #[error("Unknown network: {0}")]
    UnknownNetwork(String),
}

/// Result type for parameter operations
pub type Result<T> = std::result::Result<T, Error>;
