//! Account transaction sequencing and dispatch
//!
//! Account sends are strictly sequential: the sender's pending nonce is
//! fetched once, payee `i` gets nonce `base + i`, and every transaction is
//! signed and broadcast before the next begins. When the node rejects a
//! broadcast as an underpriced replacement the nonce is bumped and the
//! attempt repeated, up to a fixed budget.

use std::sync::Arc;

use tracing::{debug, info, warn};

use purser_params::{
    Currency, NetworkType, GAS_CONTRACT_CALL, GAS_PLAIN_TRANSFER, GAS_TOKEN_TRANSFER,
};

use crate::address::Address;
use crate::fees::FeeOracle;
use crate::node::AccountNode;
use crate::payee::{self, Payee};
use crate::signer::Signer;
use crate::token::TokenMethodEncoder;
use crate::{amount, Error, Result};

/// Broadcast attempts per payee before giving up on underpriced replacements
pub const MAX_NONCE_RETRIES: u32 = 10;

/// A resolved account transaction, ready for the signer
#[derive(Debug, Clone)]
pub struct AccountIntent {
    /// Destination: the payee, or the token contract
    pub to: Address,
    /// Native value in smallest units
    pub value: u128,
    /// Gas limit
    pub gas_limit: u64,
    /// Gas price in smallest units
    pub gas_price: u128,
    /// Sender sequence number
    pub nonce: u64,
    /// Contract call data, 0x-prefixed hex
    pub data: Option<String>,
    /// Chain id baked into the signature
    pub chain_id: u64,
}

impl AccountIntent {
    /// Fee budget this intent commits to
    pub fn fee(&self) -> u128 {
        u128::from(self.gas_limit).saturating_mul(self.gas_price)
    }
}

/// How value moves on this chain
#[derive(Debug, Clone)]
pub enum TransferMode {
    /// Native coin: gas comes out of the requested amount
    Native,
    /// Token contract call: full amount in call data, zero native value
    Token {
        /// Deployed token contract
        contract: Address,
        /// Call-data encoder for the token
        encoder: TokenMethodEncoder,
    },
}

/// Builds, signs, and broadcasts sends on one account chain
pub struct AccountTransactionBuilder {
    currency: Currency,
    network: NetworkType,
    node: Arc<dyn AccountNode>,
    oracle: FeeOracle,
    signer: Arc<dyn Signer>,
    chain_id: u64,
    mode: TransferMode,
}

impl AccountTransactionBuilder {
    /// Create a builder for one chain
    pub fn new(
        currency: Currency,
        network: NetworkType,
        node: Arc<dyn AccountNode>,
        oracle: FeeOracle,
        signer: Arc<dyn Signer>,
        chain_id: u64,
        mode: TransferMode,
    ) -> Self {
        Self {
            currency,
            network,
            node,
            oracle,
            signer,
            chain_id,
            mode,
        }
    }

    /// Send to each payee in order, one transaction per payee.
    ///
    /// Native sends check the full requested sum against the sender's
    /// balance before anything is broadcast. Token sends skip that check
    /// since the native balance only covers gas.
    ///
    /// Returns the transaction hashes in payee order. On failure, hashes
    /// already broadcast are carried inside
    /// [`Error::UnderpricedReplacement`]; other errors abort the remainder
    /// of the batch.
    pub async fn send(&self, private_key: &str, payees: &[Payee]) -> Result<Vec<String>> {
        if payees.is_empty() {
            return Err(Error::InvalidAmount(
                "At least one payee is required".to_string(),
            ));
        }
        let sender = self
            .signer
            .derive_address(self.currency, self.network, private_key)?;
        if matches!(self.mode, TransferMode::Native) {
            self.preflight_balance(&sender, payees).await?;
        }
        let base_nonce = self.node.pending_nonce(&sender).await?;
        debug!(
            currency = %self.currency,
            sender = sender.as_str(),
            base_nonce,
            payees = payees.len(),
            "dispatching account transfers"
        );

        let mut submitted = Vec::with_capacity(payees.len());
        for (index, payee) in payees.iter().enumerate() {
            let units = payee.base_units(self.currency.decimals())?;
            let txid = self
                .submit_one(
                    private_key,
                    &payee.address,
                    units,
                    base_nonce + index as u64,
                    &submitted,
                )
                .await?;
            submitted.push(txid);
        }
        info!(
            currency = %self.currency,
            count = submitted.len(),
            "account transfers dispatched"
        );
        Ok(submitted)
    }

    /// Move the sender's entire native balance, minus gas, to `to`.
    pub async fn sweep(&self, private_key: &str, to: &Address) -> Result<String> {
        if !matches!(self.mode, TransferMode::Native) {
            return Err(Error::InvalidCurrency(format!(
                "{} cannot be swept as a native coin",
                self.currency
            )));
        }
        let sender = self
            .signer
            .derive_address(self.currency, self.network, private_key)?;
        let balance = self.node.balance(&sender).await?;
        let base_nonce = self.node.pending_nonce(&sender).await?;
        let txid = self
            .submit_one(private_key, to, balance, base_nonce, &[])
            .await?;
        info!(currency = %self.currency, %txid, "swept account");
        Ok(txid)
    }

    /// Token balance of `holder`, in smallest token units, via a read-only
    /// contract call
    pub async fn token_balance(&self, holder: &Address) -> Result<u128> {
        match &self.mode {
            TransferMode::Token { contract, encoder } => {
                let data = encoder.encode_balance_of(holder);
                let raw = self.node.call_readonly(contract, &data).await?;
                amount::parse_hex_quantity(&raw)
            }
            TransferMode::Native => Err(Error::InvalidCurrency(format!(
                "{} holds no token balance",
                self.currency
            ))),
        }
    }

    async fn preflight_balance(&self, sender: &Address, payees: &[Payee]) -> Result<()> {
        let required = payee::total_base_units(payees, self.currency.decimals())?;
        let available = self.node.balance(sender).await?;
        if required > available {
            return Err(Error::InsufficientFunds {
                required,
                available,
            });
        }
        Ok(())
    }

    /// Price one transfer at the current fee quote.
    async fn build_intent(&self, to: &Address, units: u128, nonce: u64) -> Result<AccountIntent> {
        let gas_price = self.oracle.quote().await?.rate;
        match &self.mode {
            TransferMode::Native => {
                // Contract destinations get a larger gas allowance.
                let gas_limit = if self.node.has_code(to).await? {
                    GAS_CONTRACT_CALL
                } else {
                    GAS_PLAIN_TRANSFER
                };
                let gas_cost = u128::from(gas_limit)
                    .checked_mul(gas_price)
                    .ok_or_else(|| Error::AmountOverflow("Gas cost out of range".to_string()))?;
                if gas_cost >= units {
                    // Gas is paid out of the requested amount, so the
                    // amount must exceed it.
                    return Err(Error::InsufficientFunds {
                        required: gas_cost.saturating_add(1),
                        available: units,
                    });
                }
                Ok(AccountIntent {
                    to: to.clone(),
                    value: units - gas_cost,
                    gas_limit,
                    gas_price,
                    nonce,
                    data: None,
                    chain_id: self.chain_id,
                })
            }
            TransferMode::Token { contract, encoder } => Ok(AccountIntent {
                to: contract.clone(),
                value: 0,
                gas_limit: GAS_TOKEN_TRANSFER,
                gas_price,
                nonce,
                data: Some(encoder.encode_transfer_units(to, units)),
                chain_id: self.chain_id,
            }),
        }
    }

    /// Sign and broadcast one transfer, bumping the nonce on underpriced
    /// rejections until the node accepts or the retry budget runs out.
    ///
    /// The intent is rebuilt on every attempt so each retry prices gas at
    /// the current quote.
    async fn submit_one(
        &self,
        private_key: &str,
        to: &Address,
        units: u128,
        base_nonce: u64,
        submitted: &[String],
    ) -> Result<String> {
        let mut nonce = base_nonce;
        let mut attempts: u32 = 0;
        loop {
            let intent = self.build_intent(to, units, nonce).await?;
            let raw = self.signer.sign_account(&intent, private_key)?;
            match self.node.broadcast(&raw).await {
                Ok(txid) => {
                    debug!(currency = %self.currency, %txid, nonce, "transaction accepted");
                    return Ok(txid);
                }
                Err(err) if err.is_underpriced() => {
                    attempts += 1;
                    if attempts >= MAX_NONCE_RETRIES {
                        warn!(
                            currency = %self.currency,
                            attempts,
                            "nonce retry budget exhausted"
                        );
                        return Err(Error::UnderpricedReplacement {
                            attempts,
                            submitted: submitted.to_vec(),
                        });
                    }
                    warn!(
                        currency = %self.currency,
                        nonce,
                        attempt = attempts,
                        "replacement underpriced, bumping nonce"
                    );
                    nonce += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
