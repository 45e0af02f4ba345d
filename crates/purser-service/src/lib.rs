//! Purser payout service assembly
//!
//! Wires the chain clients, signer, and fee oracles from `purser-node`
//! around the transaction builders in `purser-core`, and exposes every
//! configured currency behind one registry: look up a chain by symbol,
//! then validate addresses, create wallets, send money, and read
//! balances through a uniform surface.
//!
//! The registry is built once at startup from [`config::ServiceConfig`];
//! incomplete settings fail there, never at request time.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod chains;
pub mod config;
pub mod proxy;
pub mod registry;

pub use chains::{AccountChain, GasFunding, TokenChain, UtxoChain};
pub use config::{AccountChainConfig, ServiceConfig, TokenChainConfig, UtxoChainConfig};
pub use proxy::{ChainProxy, PaymentRequest, SendOutcome};
pub use registry::{ChainRegistry, RegistryBuilder};

use tracing::{info, Level};

/// Initialize structured logging for the service process.
///
/// Call once at startup, before the registry is built. Key material is
/// never part of any event this workspace emits.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_target(false)
        .init();

    info!("Purser logging initialized");
}
