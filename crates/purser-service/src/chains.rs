//! Per-currency chain compositions
//!
//! Each chain wires a validator, fee oracle, transaction builder, node
//! client, and signer into the uniform wallet surface the registry
//! exposes: validate an address, create a wallet, send money, read a
//! balance.

use std::fmt;
use std::sync::Arc;

use purser_core::{
    amount, AccountNode, AccountTransactionBuilder, Address, AddressValidator, FeeOracle, Payee,
    Result, Signer, TokenMethodEncoder, TransferMode, UtxoNode, UtxoTransactionBuilder,
};
use purser_params::{Currency, NetworkType};
use rust_decimal::Decimal;
use tracing::info;
use zeroize::Zeroizing;

use crate::proxy::PaymentRequest;

/// A UTXO chain behind the uniform wallet surface
pub struct UtxoChain {
    currency: Currency,
    network: NetworkType,
    validator: AddressValidator,
    builder: UtxoTransactionBuilder,
    signer: Arc<dyn Signer>,
}

impl UtxoChain {
    /// Compose a UTXO chain from its collaborators
    pub fn new(
        currency: Currency,
        network: NetworkType,
        node: Arc<dyn UtxoNode>,
        oracle: FeeOracle,
        signer: Arc<dyn Signer>,
    ) -> Self {
        Self {
            currency,
            network,
            validator: AddressValidator::new(network),
            builder: UtxoTransactionBuilder::new(currency, network, node, oracle, signer.clone()),
            signer,
        }
    }

    /// Currency this chain serves
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Validate an address for this chain; `None` when it does not pass
    pub fn validate_addr(&self, address: &str) -> Option<Address> {
        self.validator.validate_opt(self.currency, address)
    }

    /// Generate a keypair and register the address watch-only with the
    /// node, so its outputs show up in unspent listings.
    pub async fn create_wallet(&self) -> Result<(Address, Zeroizing<String>)> {
        let (address, private_key) = self.signer.create_keypair(self.currency, self.network)?;
        self.builder.watch(&address).await?;
        info!(currency = %self.currency, address = %address, "Created wallet");
        Ok((address, private_key))
    }

    /// Pay every payee out of one transaction, returning its id
    pub async fn send_money(&self, private_key: &str, payees: &[PaymentRequest]) -> Result<String> {
        let payees = check_payees(&self.validator, self.currency, payees)?;
        self.builder.send(private_key, &payees).await
    }

    /// Confirmed balance of an address, in chain-native units
    pub async fn get_balance(&self, address: &str) -> Result<Decimal> {
        let address = self.validator.validate(self.currency, address)?;
        let units = self.builder.balance(&address).await?;
        amount::from_base_units(units, self.currency.decimals())
    }
}

/// The native account chain behind the uniform wallet surface
pub struct AccountChain {
    currency: Currency,
    network: NetworkType,
    validator: AddressValidator,
    builder: AccountTransactionBuilder,
    node: Arc<dyn AccountNode>,
    signer: Arc<dyn Signer>,
}

impl AccountChain {
    /// Compose the account chain from its collaborators
    pub fn new(
        currency: Currency,
        network: NetworkType,
        node: Arc<dyn AccountNode>,
        oracle: FeeOracle,
        signer: Arc<dyn Signer>,
        chain_id: u64,
    ) -> Self {
        Self {
            currency,
            network,
            validator: AddressValidator::new(network),
            builder: AccountTransactionBuilder::new(
                currency,
                network,
                node.clone(),
                oracle,
                signer.clone(),
                chain_id,
                TransferMode::Native,
            ),
            node,
            signer,
        }
    }

    /// Currency this chain serves
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Validate an address for this chain; `None` when it does not pass
    pub fn validate_addr(&self, address: &str) -> Option<Address> {
        self.validator.validate_opt(self.currency, address)
    }

    /// Generate a keypair
    pub async fn create_wallet(&self) -> Result<(Address, Zeroizing<String>)> {
        let (address, private_key) = self.signer.create_keypair(self.currency, self.network)?;
        info!(currency = %self.currency, address = %address, "Created wallet");
        Ok((address, private_key))
    }

    /// Pay each payee with its own transaction, returning ids in payee order
    pub async fn send_money(
        &self,
        private_key: &str,
        payees: &[PaymentRequest],
    ) -> Result<Vec<String>> {
        let payees = check_payees(&self.validator, self.currency, payees)?;
        self.builder.send(private_key, &payees).await
    }

    /// Balance of an address, in chain-native units
    pub async fn get_balance(&self, address: &str) -> Result<Decimal> {
        let address = self.validator.validate(self.currency, address)?;
        let units = self.node.balance(&address).await?;
        amount::from_base_units(units, self.currency.decimals())
    }

    /// Move an account's whole balance, minus gas, to one destination
    pub async fn sweep(&self, private_key: &str, to: &str) -> Result<String> {
        let to = self.validator.validate(self.currency, to)?;
        self.builder.sweep(private_key, &to).await
    }
}

/// Gas money granted to new token wallets from an operator reservoir
pub struct GasFunding {
    reservoir_key: Zeroizing<String>,
    amount: Decimal,
}

impl GasFunding {
    /// Grant `amount` of the base currency from the reservoir key
    pub fn new(reservoir_key: Zeroizing<String>, amount: Decimal) -> Self {
        Self {
            reservoir_key,
            amount,
        }
    }
}

impl fmt::Debug for GasFunding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GasFunding")
            .field("amount", &self.amount)
            .finish()
    }
}

/// A token contract riding the account chain, behind the uniform surface
pub struct TokenChain {
    currency: Currency,
    network: NetworkType,
    validator: AddressValidator,
    builder: AccountTransactionBuilder,
    native_builder: AccountTransactionBuilder,
    funding: Option<GasFunding>,
    signer: Arc<dyn Signer>,
}

impl TokenChain {
    /// Compose the token chain from its collaborators.
    ///
    /// Token transfers and the reservoir's gas grants ride the same node
    /// and gas price policy; only the transfer mode differs.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        currency: Currency,
        network: NetworkType,
        node: Arc<dyn AccountNode>,
        oracle: FeeOracle,
        signer: Arc<dyn Signer>,
        chain_id: u64,
        contract: Address,
        funding: Option<GasFunding>,
    ) -> Self {
        let encoder = TokenMethodEncoder::new(currency.decimals());
        Self {
            currency,
            network,
            validator: AddressValidator::new(network),
            builder: AccountTransactionBuilder::new(
                currency,
                network,
                node.clone(),
                oracle.clone(),
                signer.clone(),
                chain_id,
                TransferMode::Token { contract, encoder },
            ),
            native_builder: AccountTransactionBuilder::new(
                Currency::Eth,
                network,
                node,
                oracle,
                signer.clone(),
                chain_id,
                TransferMode::Native,
            ),
            funding,
            signer,
        }
    }

    /// Currency this chain serves
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Validate an address for this chain; `None` when it does not pass
    pub fn validate_addr(&self, address: &str) -> Option<Address> {
        self.validator.validate_opt(self.currency, address)
    }

    /// Generate a keypair, granting it gas money from the reservoir when
    /// one is configured. A token wallet cannot move tokens without the
    /// base currency to pay gas.
    pub async fn create_wallet(&self) -> Result<(Address, Zeroizing<String>)> {
        let (address, private_key) = self.signer.create_keypair(self.currency, self.network)?;
        if let Some(funding) = &self.funding {
            let grant = Payee::new(address.clone(), funding.amount);
            self.native_builder
                .send(&funding.reservoir_key, &[grant])
                .await?;
            info!(
                currency = %self.currency,
                address = %address,
                amount = %funding.amount,
                "Funded new wallet with gas money"
            );
        }
        info!(currency = %self.currency, address = %address, "Created wallet");
        Ok((address, private_key))
    }

    /// Pay each payee with its own transfer call, returning ids in payee
    /// order
    pub async fn send_money(
        &self,
        private_key: &str,
        payees: &[PaymentRequest],
    ) -> Result<Vec<String>> {
        let payees = check_payees(&self.validator, self.currency, payees)?;
        self.builder.send(private_key, &payees).await
    }

    /// Token balance of an address via a read-only contract call
    pub async fn get_balance(&self, address: &str) -> Result<Decimal> {
        let address = self.validator.validate(self.currency, address)?;
        let units = self.builder.token_balance(&address).await?;
        amount::from_base_units(units, self.currency.decimals())
    }
}

fn check_payees(
    validator: &AddressValidator,
    currency: Currency,
    payees: &[PaymentRequest],
) -> Result<Vec<Payee>> {
    payees
        .iter()
        .map(|request| {
            let address = validator.validate(currency, &request.address)?;
            Ok(Payee::new(address, request.amount))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gas_funding_debug_omits_the_key() {
        let funding = GasFunding::new(
            Zeroizing::new("0xdeadbeef".to_string()),
            Decimal::new(1, 1),
        );
        let rendered = format!("{funding:?}");
        assert!(!rendered.contains("deadbeef"));
        assert!(rendered.contains("0.1"));
    }
}
