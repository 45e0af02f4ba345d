//! UTXO transaction planning and dispatch
//!
//! Planning is spend-everything: every unspent output the node reports
//! funds the transaction, the fee is deducted from the payees in
//! deterministic shares, and any surplus returns to the sender as change.
//! One send produces exactly one broadcast transaction.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use purser_params::{Currency, NetworkType};

use crate::address::Address;
use crate::fees::FeeOracle;
use crate::node::UtxoNode;
use crate::payee::{self, Payee};
use crate::signer::Signer;
use crate::{amount, Error, Result};

/// Bytes a pay-to-pubkey-hash input contributes to the size estimate
pub const INPUT_SIZE_BYTES: u64 = 148;
/// Bytes an output contributes to the size estimate
pub const OUTPUT_SIZE_BYTES: u64 = 34;
/// Fixed framing overhead of a transaction, in bytes
pub const TX_OVERHEAD_BYTES: u64 = 10;
/// Confirmations an output needs before it is spendable here
pub const MIN_CONFIRMATIONS: u32 = 1;

/// One spendable output, as reported by the node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unspent {
    /// Funding transaction id
    pub txid: String,
    /// Output index within the funding transaction
    pub vout: u32,
    /// Value in smallest units
    pub amount: u128,
    /// Confirmation count at fetch time
    pub confirmations: u64,
    /// Locking script, hex
    pub script_pubkey: String,
}

/// One planned output
#[derive(Debug, Clone)]
pub struct PlannedOutput {
    /// Destination
    pub address: Address,
    /// Value in smallest units
    pub amount: u128,
}

/// A resolved UTXO transaction, ready for the signer.
///
/// Outputs hold the fee-adjusted payees in request order, followed by the
/// change output when one exists.
#[derive(Debug, Clone)]
pub struct UtxoIntent {
    /// Currency this intent settles on
    pub currency: Currency,
    /// Inputs, consumed in full
    pub inputs: Vec<Unspent>,
    /// Outputs in final transaction order
    pub outputs: Vec<PlannedOutput>,
    /// Total fee in smallest units
    pub fee: u128,
    /// Value returned to the sender, zero when no change output exists
    pub change: u128,
}

impl UtxoIntent {
    /// Sum of all input values
    pub fn input_total(&self) -> u128 {
        self.inputs.iter().map(|u| u.amount).sum()
    }

    /// Sum of all output values
    pub fn output_total(&self) -> u128 {
        self.outputs.iter().map(|o| o.amount).sum()
    }

    /// True when inputs exactly cover outputs plus fee
    pub fn conserves_value(&self) -> bool {
        self.output_total()
            .checked_add(self.fee)
            .map(|spent| spent == self.input_total())
            .unwrap_or(false)
    }
}

/// Estimated serialized size of a pay-to-pubkey-hash transaction
pub fn estimate_tx_size(num_inputs: usize, num_outputs: usize) -> u64 {
    INPUT_SIZE_BYTES * num_inputs as u64 + OUTPUT_SIZE_BYTES * num_outputs as u64 + TX_OVERHEAD_BYTES
}

/// Plans, signs, and broadcasts sends on one UTXO chain
pub struct UtxoTransactionBuilder {
    currency: Currency,
    network: NetworkType,
    node: Arc<dyn UtxoNode>,
    oracle: FeeOracle,
    signer: Arc<dyn Signer>,
}

impl UtxoTransactionBuilder {
    /// Create a builder for one chain
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
            node,
            oracle,
            signer,
        }
    }

    /// Resolve a send request into a fee-correct transaction plan.
    ///
    /// The fee is `fee_rate` times the estimated size, where the size
    /// counts only payee outputs. It is split into equal shares across the
    /// payees, with the first `fee % payees` shares one unit larger so the
    /// shares sum exactly to the fee. Surplus input value goes back to
    /// `change_address`.
    pub fn plan(
        currency: Currency,
        unspents: Vec<Unspent>,
        payees: &[Payee],
        fee_rate: u128,
        change_address: Address,
    ) -> Result<UtxoIntent> {
        if payees.is_empty() {
            return Err(Error::InvalidAmount(
                "At least one payee is required".to_string(),
            ));
        }
        let decimals = currency.decimals();
        let mut requested = Vec::with_capacity(payees.len());
        for payee in payees {
            let units = payee.base_units(decimals)?;
            if units == 0 {
                return Err(Error::InvalidAmount(format!(
                    "Amount for {} must be positive",
                    payee.address.as_str()
                )));
            }
            requested.push(units);
        }
        let total_out = amount::checked_sum(requested.iter().copied())?;
        let total_in = amount::checked_sum(unspents.iter().map(|u| u.amount))?;
        // Insufficiency is judged before the fee. Fee coverage surfaces
        // per payee below, when a share cannot be deducted.
        if total_out > total_in {
            return Err(Error::InsufficientFunds {
                required: total_out,
                available: total_in,
            });
        }

        let size = estimate_tx_size(unspents.len(), payees.len());
        let fee = fee_rate
            .checked_mul(u128::from(size))
            .ok_or_else(|| Error::AmountOverflow("Fee out of range".to_string()))?;

        let share = fee / requested.len() as u128;
        let remainder = fee % requested.len() as u128;

        let mut outputs = Vec::with_capacity(payees.len() + 1);
        for (index, (payee, units)) in payees.iter().zip(&requested).enumerate() {
            let deduction = share + u128::from((index as u128) < remainder);
            let adjusted = units
                .checked_sub(deduction)
                .filter(|adjusted| *adjusted > 0)
                .ok_or(Error::InsufficientFunds {
                    required: deduction.saturating_add(1),
                    available: *units,
                })?;
            outputs.push(PlannedOutput {
                address: payee.address.clone(),
                amount: adjusted,
            });
        }

        let change = total_in - total_out;
        if change > 0 {
            outputs.push(PlannedOutput {
                address: change_address,
                amount: change,
            });
        }

        Ok(UtxoIntent {
            currency,
            inputs: unspents,
            outputs,
            fee,
            change,
        })
    }

    /// Build, sign, and broadcast one transaction paying `payees`.
    ///
    /// Returns the transaction id assigned by the node.
    pub async fn send(&self, private_key: &str, payees: &[Payee]) -> Result<String> {
        let sender = self
            .signer
            .derive_address(self.currency, self.network, private_key)?;
        let unspents = self.node.list_unspent(&sender, MIN_CONFIRMATIONS).await?;
        if unspents.is_empty() {
            // Nothing to spend. Fail before consulting the fee oracle.
            return Err(Error::InsufficientFunds {
                required: payee::total_base_units(payees, self.currency.decimals())?,
                available: 0,
            });
        }
        let quote = self.oracle.quote().await?;
        debug!(
            currency = %self.currency,
            inputs = unspents.len(),
            payees = payees.len(),
            rate = quote.rate,
            "planning transaction"
        );
        let intent = Self::plan(self.currency, unspents, payees, quote.rate, sender)?;
        let raw = self.signer.sign_utxo(&intent, private_key)?;
        let txid = self.node.broadcast(&raw).await?;
        info!(currency = %self.currency, %txid, fee = intent.fee, "broadcast transaction");
        Ok(txid)
    }

    /// Spendable balance: the sum of confirmed unspent outputs
    pub async fn balance(&self, address: &Address) -> Result<u128> {
        let unspents = self.node.list_unspent(address, MIN_CONFIRMATIONS).await?;
        amount::checked_sum(unspents.iter().map(|u| u.amount))
    }

    /// Register an address with the node for unspent tracking
    pub async fn watch(&self, address: &Address) -> Result<()> {
        self.node.import_watch_only(address).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn unspent(txid: &str, amount: u128) -> Unspent {
        Unspent {
            txid: txid.to_string(),
            vout: 0,
            amount,
            confirmations: 6,
            script_pubkey: "76a914000000000000000000000000000000000000000088ac".to_string(),
        }
    }

    fn payee(name: &str, amount: &str) -> Payee {
        Payee::new(
            Address::unchecked(Currency::Btc, name),
            Decimal::from_str(amount).unwrap(),
        )
    }

    fn change_addr() -> Address {
        Address::unchecked(Currency::Btc, "change")
    }

    #[test]
    fn test_fee_splits_remainder_first() {
        // 1 input, 3 payees: 148 + 3 * 34 + 10 = 260 bytes at 1 sat/byte.
        // 260 / 3 = 86 rem 2, so deductions are 87, 87, 86.
        let intent = UtxoTransactionBuilder::plan(
            Currency::Btc,
            vec![unspent("aa", 10_000)],
            &[
                payee("p1", "0.00001"),
                payee("p2", "0.00001"),
                payee("p3", "0.00001"),
            ],
            1,
            change_addr(),
        )
        .unwrap();

        assert_eq!(intent.fee, 260);
        assert_eq!(intent.outputs[0].amount, 1_000 - 87);
        assert_eq!(intent.outputs[1].amount, 1_000 - 87);
        assert_eq!(intent.outputs[2].amount, 1_000 - 86);
        assert!(intent.conserves_value());
    }

    #[test]
    fn test_single_payee_absorbs_whole_fee() {
        // 148 + 34 + 10 = 192 bytes at 2 sat/byte.
        let intent = UtxoTransactionBuilder::plan(
            Currency::Btc,
            vec![unspent("aa", 100_000)],
            &[payee("p1", "0.0005")],
            2,
            change_addr(),
        )
        .unwrap();

        assert_eq!(intent.fee, 384);
        assert_eq!(intent.outputs[0].amount, 50_000 - 384);
        assert_eq!(intent.change, 50_000);
        assert!(intent.conserves_value());
    }

    #[test]
    fn test_change_returns_surplus_to_sender() {
        let intent = UtxoTransactionBuilder::plan(
            Currency::Btc,
            vec![unspent("aa", 70_000), unspent("bb", 30_000)],
            &[payee("p1", "0.0006")],
            1,
            change_addr(),
        )
        .unwrap();

        // Two inputs, one payee: 148 * 2 + 34 + 10 = 340 bytes.
        assert_eq!(intent.fee, 340);
        assert_eq!(intent.outputs.len(), 2);
        assert_eq!(intent.outputs[1].address.as_str(), "change");
        assert_eq!(intent.outputs[1].amount, 40_000);
        assert!(intent.conserves_value());
    }

    #[test]
    fn test_no_change_output_when_inputs_match_exactly() {
        let intent = UtxoTransactionBuilder::plan(
            Currency::Btc,
            vec![unspent("aa", 60_000)],
            &[payee("p1", "0.0006")],
            1,
            change_addr(),
        )
        .unwrap();

        assert_eq!(intent.change, 0);
        assert_eq!(intent.outputs.len(), 1);
        assert!(intent.conserves_value());
    }

    #[test]
    fn test_insufficient_inputs_fail_before_fees() {
        let err = UtxoTransactionBuilder::plan(
            Currency::Btc,
            vec![unspent("aa", 50_000)],
            &[payee("p1", "0.0006")],
            1,
            change_addr(),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            Error::InsufficientFunds {
                required: 60_000,
                available: 50_000,
            }
        ));
    }

    #[test]
    fn test_payee_smaller_than_fee_share_is_rejected() {
        // Fee is 192, payee only has 100 sats requested.
        let err = UtxoTransactionBuilder::plan(
            Currency::Btc,
            vec![unspent("aa", 100_000)],
            &[payee("p1", "0.000001")],
            1,
            change_addr(),
        )
        .unwrap_err();

        assert!(matches!(err, Error::InsufficientFunds { .. }));
    }

    #[test]
    fn test_payee_left_with_one_unit_is_accepted() {
        // Fee 192, payee requests 193: adjusted output is exactly 1 sat.
        let intent = UtxoTransactionBuilder::plan(
            Currency::Btc,
            vec![unspent("aa", 193)],
            &[payee("p1", "0.00000193")],
            1,
            change_addr(),
        )
        .unwrap();

        assert_eq!(intent.outputs[0].amount, 1);
        assert!(intent.conserves_value());
    }

    #[test]
    fn test_empty_payees_rejected() {
        let err = UtxoTransactionBuilder::plan(
            Currency::Btc,
            vec![unspent("aa", 10_000)],
            &[],
            1,
            change_addr(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidAmount(_)));
    }

    #[test]
    fn test_zero_amount_payee_rejected() {
        let err = UtxoTransactionBuilder::plan(
            Currency::Btc,
            vec![unspent("aa", 10_000)],
            &[payee("p1", "0")],
            1,
            change_addr(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidAmount(_)));
    }

    #[test]
    fn test_size_estimate() {
        assert_eq!(estimate_tx_size(1, 1), 192);
        assert_eq!(estimate_tx_size(2, 3), 408);
    }
}
