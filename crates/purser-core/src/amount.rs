//! Amount conversion between chain-native decimals and smallest units
//!
//! All fee and conservation arithmetic happens in integer smallest units
//! (`u128`); `Decimal` appears only at the API boundary.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::{Error, Result};

/// Convert a chain-native decimal amount into integer smallest units.
///
/// Rejects negative amounts and amounts finer than one smallest unit; no
/// silent rounding happens anywhere in the payout path.
pub fn to_base_units(amount: Decimal, decimals: u32) -> Result<u128> {
    if amount.is_sign_negative() {
        return Err(Error::InvalidAmount(format!(
            "Amount cannot be negative: {}",
            amount
        )));
    }

    let scale = pow10_decimal(decimals)?;
    let scaled = amount
        .checked_mul(scale)
        .ok_or_else(|| Error::AmountOverflow(format!("Amount out of range: {}", amount)))?;

    if scaled != scaled.trunc() {
        return Err(Error::InvalidAmount(format!(
            "Amount {} is finer than the smallest unit ({} decimals)",
            amount, decimals
        )));
    }

    scaled
        .to_u128()
        .ok_or_else(|| Error::AmountOverflow(format!("Amount out of range: {}", amount)))
}

/// Convert integer smallest units back to a normalized decimal amount.
///
/// Trailing zeros are stripped, so integral balances render bare (`12`
/// rather than `12.00000000`).
pub fn from_base_units(units: u128, decimals: u32) -> Result<Decimal> {
    let signed = i128::try_from(units)
        .map_err(|_| Error::AmountOverflow(format!("Balance out of range: {}", units)))?;
    let value = Decimal::try_from_i128_with_scale(signed, decimals)
        .map_err(|_| Error::AmountOverflow(format!("Balance out of range: {}", units)))?;
    Ok(value.normalize())
}

fn pow10_decimal(decimals: u32) -> Result<Decimal> {
    let scale = 10u128
        .checked_pow(decimals)
        .ok_or_else(|| Error::AmountOverflow(format!("Unsupported scale: {}", decimals)))?;
    let scale = u64::try_from(scale)
        .map_err(|_| Error::AmountOverflow(format!("Unsupported scale: {}", decimals)))?;
    Ok(Decimal::from(scale))
}

/// Checked sum of smallest-unit values
pub fn checked_sum<I: IntoIterator<Item = u128>>(values: I) -> Result<u128> {
    let mut total: u128 = 0;
    for value in values {
        total = total
            .checked_add(value)
            .ok_or_else(|| Error::AmountOverflow("Sum out of range".to_string()))?;
    }
    Ok(total)
}

/// Parse a hex quantity as account-chain nodes report them.
///
/// Accepts the `0x` prefix optionally, and treats a bare `0x` (an empty
/// call result) as zero.
pub fn parse_hex_quantity(value: &str) -> Result<u128> {
    let digits = value.trim();
    let digits = digits.strip_prefix("0x").unwrap_or(digits);
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16)
        .map_err(|_| Error::InvalidAmount(format!("Bad hex quantity: {}", value)))
}
