//! Payment recipients

use rust_decimal::Decimal;

use crate::address::Address;
use crate::{amount, Result};

/// One payment recipient: a validated address and a chain-native amount.
///
/// Payee order is significant: it drives fee apportionment on UTXO chains
/// and nonce assignment on account chains.
#[derive(Debug, Clone)]
pub struct Payee {
    /// Destination address
    pub address: Address,
    /// Amount in chain-native units
    pub amount: Decimal,
}

impl Payee {
    /// Create a payee
    pub fn new(address: Address, amount: Decimal) -> Self {
        Self { address, amount }
    }

    /// Amount in smallest units for the given decimal scale
    pub fn base_units(&self, decimals: u32) -> Result<u128> {
        amount::to_base_units(self.amount, decimals)
    }
}

/// Sum of all payee amounts in smallest units
pub fn total_base_units(payees: &[Payee], decimals: u32) -> Result<u128> {
    let mut total: u128 = 0;
    for payee in payees {
        total = amount::checked_sum([total, payee.base_units(decimals)?])?;
    }
    Ok(total)
}
