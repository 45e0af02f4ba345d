//! Purser wallet core
//!
//! This crate implements the chain-independent payment engine: address
//! validation, amount arithmetic, fee resolution, UTXO planning, account
//! sequencing, and token call-data encoding. Transports and signers plug
//! in through the traits in [`node`] and [`signer`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod account;
pub mod address;
pub mod amount;
pub mod error;
pub mod fees;
pub mod node;
pub mod payee;
pub mod signer;
pub mod token;
pub mod utxo;

pub use account::{
    AccountIntent, AccountTransactionBuilder, TransferMode, MAX_NONCE_RETRIES,
};
pub use address::{Address, AddressValidator};
pub use error::{Error, ErrorCategory, Result};
pub use fees::{FeeEstimator, FeeOracle, FeeQuote, FeeSource};
pub use node::{AccountNode, UtxoNode};
pub use payee::Payee;
pub use signer::Signer;
pub use token::{TokenMethodEncoder, BALANCE_OF_SIGNATURE, TRANSFER_SIGNATURE};
pub use utxo::{
    PlannedOutput, Unspent, UtxoIntent, UtxoTransactionBuilder, MIN_CONFIRMATIONS,
};
