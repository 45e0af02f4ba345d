//! Uniform dispatch over the configured chains

use std::fmt;

use purser_core::{Address, Result};
use purser_params::Currency;
use rust_decimal::Decimal;
use serde::Deserialize;
use zeroize::Zeroizing;

use crate::chains::{AccountChain, TokenChain, UtxoChain};

/// A requested payment, before address validation
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentRequest {
    /// Destination address as the caller supplied it
    pub address: String,
    /// Amount in chain-native units
    pub amount: Decimal,
}

impl PaymentRequest {
    /// Create a payment request
    pub fn new(address: impl Into<String>, amount: Decimal) -> Self {
        Self {
            address: address.into(),
            amount,
        }
    }
}

/// Transaction ids produced by one send
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// UTXO chains broadcast one transaction covering every payee
    Single(String),
    /// Account chains broadcast one transaction per payee, in payee order
    PerPayee(Vec<String>),
}

impl SendOutcome {
    /// All transaction ids, in broadcast order
    pub fn into_ids(self) -> Vec<String> {
        match self {
            SendOutcome::Single(id) => vec![id],
            SendOutcome::PerPayee(ids) => ids,
        }
    }
}

/// One configured currency behind the uniform wallet surface.
///
/// Deliberately a closed enum: adding a currency means adding a variant,
/// and the compiler walks every dispatch site.
pub enum ChainProxy {
    /// A chain accounted in unspent outputs
    Utxo(UtxoChain),
    /// The native account chain
    Account(AccountChain),
    /// A token contract riding the account chain
    Token(TokenChain),
}

impl fmt::Debug for ChainProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let family = match self {
            ChainProxy::Utxo(_) => "Utxo",
            ChainProxy::Account(_) => "Account",
            ChainProxy::Token(_) => "Token",
        };
        f.debug_struct("ChainProxy")
            .field("family", &family)
            .field("currency", &self.currency())
            .finish()
    }
}

impl ChainProxy {
    /// Currency this proxy serves
    pub fn currency(&self) -> Currency {
        match self {
            ChainProxy::Utxo(chain) => chain.currency(),
            ChainProxy::Account(chain) => chain.currency(),
            ChainProxy::Token(chain) => chain.currency(),
        }
    }

    /// Validate an address, returning its canonical form; `None` when it
    /// does not pass this chain's rules
    pub fn validate_addr(&self, address: &str) -> Option<Address> {
        match self {
            ChainProxy::Utxo(chain) => chain.validate_addr(address),
            ChainProxy::Account(chain) => chain.validate_addr(address),
            ChainProxy::Token(chain) => chain.validate_addr(address),
        }
    }

    /// Create a keypair, with chain-specific setup side effects: UTXO
    /// chains register the address watch-only, the token chain grants gas
    /// money from its reservoir when one is configured.
    pub async fn create_wallet(&self) -> Result<(Address, Zeroizing<String>)> {
        match self {
            ChainProxy::Utxo(chain) => chain.create_wallet().await,
            ChainProxy::Account(chain) => chain.create_wallet().await,
            ChainProxy::Token(chain) => chain.create_wallet().await,
        }
    }

    /// Dispatch payments, returning ids shaped by the chain family
    pub async fn send_money(
        &self,
        private_key: &str,
        payees: &[PaymentRequest],
    ) -> Result<SendOutcome> {
        match self {
            ChainProxy::Utxo(chain) => chain
                .send_money(private_key, payees)
                .await
                .map(SendOutcome::Single),
            ChainProxy::Account(chain) => chain
                .send_money(private_key, payees)
                .await
                .map(SendOutcome::PerPayee),
            ChainProxy::Token(chain) => chain
                .send_money(private_key, payees)
                .await
                .map(SendOutcome::PerPayee),
        }
    }

    /// Balance of an address, in chain-native units
    pub async fn get_balance(&self, address: &str) -> Result<Decimal> {
        match self {
            ChainProxy::Utxo(chain) => chain.get_balance(address).await,
            ChainProxy::Account(chain) => chain.get_balance(address).await,
            ChainProxy::Token(chain) => chain.get_balance(address).await,
        }
    }
}
