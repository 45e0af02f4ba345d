//! Token contract call data
//!
//! A deliberately narrow encoder for the two call shapes the token chain
//! uses. It packs selectors and 32-byte words by hand and is not a general
//! contract ABI library.

use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use sha3::{Digest, Keccak256};

use crate::address::Address;
use crate::{amount, Result};

/// Canonical signature of the token transfer method
pub const TRANSFER_SIGNATURE: &str = "transfer(address,uint256)";
/// Canonical signature of the token balance query
pub const BALANCE_OF_SIGNATURE: &str = "balanceOf(address)";

static TRANSFER_SELECTOR: Lazy<String> = Lazy::new(|| method_selector(TRANSFER_SIGNATURE));
static BALANCE_OF_SELECTOR: Lazy<String> = Lazy::new(|| method_selector(BALANCE_OF_SIGNATURE));

/// First four bytes of the Keccak-256 digest of a canonical method
/// signature, as 0x-prefixed hex
pub fn method_selector(signature: &str) -> String {
    let digest = Keccak256::digest(signature.as_bytes());
    format!("0x{}", hex::encode(&digest[..4]))
}

/// Encodes call data for the token contract
#[derive(Debug, Clone, Copy)]
pub struct TokenMethodEncoder {
    decimals: u32,
}

impl TokenMethodEncoder {
    /// Encoder for a token with the given decimal precision
    pub const fn new(decimals: u32) -> Self {
        Self { decimals }
    }

    /// Call data moving a token amount, given in token units, to `to`
    pub fn encode_transfer(&self, to: &Address, token_amount: Decimal) -> Result<String> {
        let units = amount::to_base_units(token_amount, self.decimals)?;
        Ok(self.encode_transfer_units(to, units))
    }

    /// Call data moving `units` smallest token units to `to`
    pub fn encode_transfer_units(&self, to: &Address, units: u128) -> String {
        format!("{}{}{}", *TRANSFER_SELECTOR, pad_address(to), pad_uint(units))
    }

    /// Call data querying the token balance of `holder`
    pub fn encode_balance_of(&self, holder: &Address) -> String {
        format!("{}{}", *BALANCE_OF_SELECTOR, pad_address(holder))
    }
}

/// An address as a left-padded 32-byte word, lowercase hex
fn pad_address(address: &Address) -> String {
    let bare = address
        .as_str()
        .trim_start_matches("0x")
        .to_ascii_lowercase();
    format!("{:0>64}", bare)
}

/// An unsigned quantity as a left-padded 32-byte word, lowercase hex
fn pad_uint(value: u128) -> String {
    format!("{:064x}", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use purser_params::Currency;
    use std::str::FromStr;

    fn holder() -> Address {
        Address::unchecked(Currency::Dai, "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed")
    }

    #[test]
    fn test_transfer_selector() {
        assert_eq!(method_selector(TRANSFER_SIGNATURE), "0xa9059cbb");
    }

    #[test]
    fn test_balance_of_selector() {
        assert_eq!(method_selector(BALANCE_OF_SIGNATURE), "0x70a08231");
    }

    #[test]
    fn test_selectors_are_stable_across_calls() {
        let encoder = TokenMethodEncoder::new(18);
        let first = encoder.encode_balance_of(&holder());
        let second = encoder.encode_balance_of(&holder());
        assert_eq!(first, second);
    }

    #[test]
    fn test_transfer_call_data_layout() {
        let encoder = TokenMethodEncoder::new(18);
        let data = encoder
            .encode_transfer(&holder(), Decimal::from_str("1.5").unwrap())
            .unwrap();

        // selector + two 32-byte words
        assert_eq!(data.len(), 2 + 8 + 64 + 64);
        assert!(data.starts_with("0xa9059cbb"));
        // address word: 24 zero digits then the lowercased address
        assert_eq!(
            &data[10..74],
            "0000000000000000000000005aaeb6053f3e94c9b9a09f33669435e7ef1beaed"
        );
        // 1.5 tokens at 18 decimals
        assert_eq!(
            &data[74..],
            "00000000000000000000000000000000000000000000000014d1120d7b160000"
        );
    }

    #[test]
    fn test_transfer_scales_by_declared_decimals() {
        let encoder = TokenMethodEncoder::new(6);
        let data = encoder
            .encode_transfer(&holder(), Decimal::from_str("2").unwrap())
            .unwrap();
        // 2_000_000 == 0x1e8480
        assert!(data.ends_with("00000000000000000000000000000000000000000000000000000000001e8480"));
    }

    #[test]
    fn test_balance_of_call_data_layout() {
        let encoder = TokenMethodEncoder::new(18);
        let data = encoder.encode_balance_of(&holder());
        assert_eq!(data.len(), 2 + 8 + 64);
        assert!(data.starts_with("0x70a08231"));
        assert!(data.ends_with("5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"));
    }

    #[test]
    fn test_too_fine_amount_is_rejected() {
        let encoder = TokenMethodEncoder::new(6);
        let err = encoder
            .encode_transfer(&holder(), Decimal::from_str("0.0000001").unwrap())
            .unwrap_err();
        assert!(matches!(err, crate::Error::InvalidAmount(_)));
    }
}
