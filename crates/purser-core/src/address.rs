//! Chain-aware address validation
//!
//! Validation is chain-first, then network: an address is checked against
//! the selected chain's own syntax and version rules before any network
//! distinction, so a test-network address of one chain can never pass as a
//! different chain that happens to share a prefix byte.

use std::fmt;

use purser_params::{ChainParams, Currency, NetworkType};
use sha3::{Digest, Keccak256};

use crate::{Error, Result};

/// A validated, canonical chain address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    currency: Currency,
    value: String,
}

impl Address {
    fn new(currency: Currency, value: String) -> Self {
        Self { currency, value }
    }

    /// Currency this address validated against
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Canonical string form
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Consume into the canonical string
    pub fn into_string(self) -> String {
        self.value
    }

    /// Build an address without validation (tests only)
    #[cfg(any(test, feature = "test-helpers"))]
    pub fn unchecked(currency: Currency, value: &str) -> Self {
        Self::new(currency, value.to_string())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// Validates addresses for every supported chain on one network
#[derive(Debug, Clone, Copy)]
pub struct AddressValidator {
    network: NetworkType,
}

impl AddressValidator {
    /// Create a validator for the given network
    pub const fn new(network: NetworkType) -> Self {
        Self { network }
    }

    /// Network this validator checks against
    pub const fn network(&self) -> NetworkType {
        self.network
    }

    /// Validate an address for a currency, returning its canonical form.
    ///
    /// Canonical means the legacy Base58 form for Bitcoin Cash (the form
    /// the node RPC understands) and the input as given everywhere else.
    pub fn validate(&self, currency: Currency, address: &str) -> Result<Address> {
        match currency {
            Currency::Btc | Currency::Ltc => self.validate_base58_or_segwit(currency, address),
            Currency::Bch => self.validate_cash(currency, address),
            Currency::Eth | Currency::Dai => validate_account_address(currency, address),
        }
    }

    /// Validation as an option, for surfaces that report invalid as absent
    pub fn validate_opt(&self, currency: Currency, address: &str) -> Option<Address> {
        self.validate(currency, address).ok()
    }

    fn validate_base58_or_segwit(&self, currency: Currency, address: &str) -> Result<Address> {
        let params = ChainParams::for_currency(currency, self.network);

        if let Some(hrp) = params.bech32_hrp {
            let lowered = address.to_ascii_lowercase();
            if lowered.starts_with(hrp) && lowered.as_bytes().get(hrp.len()) == Some(&b'1') {
                match decode_segwit(address, hrp) {
                    Ok(()) => return Ok(Address::new(currency, address.to_string())),
                    Err(err) => {
                        // A legacy address can share the prefix shape, so give
                        // Base58 a chance before rejecting.
                        if decode_base58(address, &params).is_ok() {
                            return Ok(Address::new(currency, address.to_string()));
                        }
                        return Err(err);
                    }
                }
            }
        }

        decode_base58(address, &params)?;
        Ok(Address::new(currency, address.to_string()))
    }

    fn validate_cash(&self, currency: Currency, address: &str) -> Result<Address> {
        let params = ChainParams::for_currency(currency, self.network);

        // Legacy Base58 is the wire format the node understands; CashAddr
        // input is canonicalized down to it.
        if decode_base58(address, &params).is_ok() {
            return Ok(Address::new(currency, address.to_string()));
        }

        let hrp = params
            .cashaddr_hrp
            .ok_or_else(|| Error::InvalidAddress("CashAddr not supported here".to_string()))?;
        let (kind, hash) = cashaddr::decode(address, hrp)?;
        let version = match kind {
            cashaddr::CashAddrType::P2pkh => params.p2pkh_prefix,
            cashaddr::CashAddrType::P2sh => params.p2sh_prefix,
        }
        .ok_or_else(|| Error::InvalidAddress("No legacy form for this address type".to_string()))?;

        let legacy = bs58::encode(&hash).with_check_version(version).into_string();
        Ok(Address::new(currency, legacy))
    }
}

fn decode_segwit(address: &str, expected_hrp: &str) -> Result<()> {
    let (hrp, version, program) = bech32::segwit::decode(address)
        .map_err(|e| Error::InvalidAddress(format!("Bad bech32 address: {}", e)))?;

    if !hrp.as_str().eq_ignore_ascii_case(expected_hrp) {
        return Err(Error::InvalidAddress(format!(
            "Prefix {} does not belong to this chain and network",
            hrp
        )));
    }
    if version.to_u8() != 0 {
        return Err(Error::InvalidAddress(format!(
            "Unsupported witness version {}",
            version.to_u8()
        )));
    }
    if program.len() != 20 && program.len() != 32 {
        return Err(Error::InvalidAddress(format!(
            "Bad witness program length {}",
            program.len()
        )));
    }
    Ok(())
}

fn decode_base58(address: &str, params: &ChainParams) -> Result<(u8, Vec<u8>)> {
    let decoded = bs58::decode(address)
        .with_check(None)
        .into_vec()
        .map_err(|e| Error::InvalidAddress(format!("Bad Base58 address: {}", e)))?;

    if decoded.len() != 21 {
        return Err(Error::InvalidAddress(format!(
            "Unexpected payload length {}",
            decoded.len()
        )));
    }

    let version = decoded[0];
    if !params.accepts_base58_version(version) {
        return Err(Error::InvalidAddress(format!(
            "Version byte {:#04x} does not belong to {} {}",
            version,
            params.name,
            params.network.name()
        )));
    }

    Ok((version, decoded[1..].to_vec()))
}

fn validate_account_address(currency: Currency, address: &str) -> Result<Address> {
    let hex_part = address
        .strip_prefix("0x")
        .ok_or_else(|| Error::InvalidAddress("Missing 0x prefix".to_string()))?;

    if hex_part.len() != 40 || !hex_part.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::InvalidAddress(
            "Expected 40 hex characters after 0x".to_string(),
        ));
    }

    let has_upper = hex_part.bytes().any(|b| b.is_ascii_uppercase());
    let has_lower = hex_part.bytes().any(|b| b.is_ascii_lowercase());
    if has_upper && has_lower {
        verify_checksum_casing(hex_part)?;
    }

    Ok(Address::new(currency, address.to_string()))
}

/// Mixed-case account addresses must match the Keccak checksum casing.
fn verify_checksum_casing(hex_part: &str) -> Result<()> {
    let lower = hex_part.to_ascii_lowercase();
    let hash = Keccak256::digest(lower.as_bytes());

    for (i, c) in hex_part.chars().enumerate() {
        if !c.is_ascii_alphabetic() {
            continue;
        }
        let nibble = if i % 2 == 0 {
            hash[i / 2] >> 4
        } else {
            hash[i / 2] & 0x0f
        };
        if (nibble >= 8) != c.is_ascii_uppercase() {
            return Err(Error::InvalidAddress(
                "Checksum casing mismatch".to_string(),
            ));
        }
    }
    Ok(())
}

mod cashaddr {
    //! Narrow CashAddr decoder: enough to accept and canonicalize payment
    //! addresses, nothing more.

    use crate::{Error, Result};

    const CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";

    /// Address kinds a CashAddr can carry
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(super) enum CashAddrType {
        /// Pay to pubkey hash
        P2pkh,
        /// Pay to script hash
        P2sh,
    }

    pub(super) fn decode(address: &str, expected_prefix: &str) -> Result<(CashAddrType, Vec<u8>)> {
        let has_upper = address.bytes().any(|b| b.is_ascii_uppercase());
        let has_lower = address.bytes().any(|b| b.is_ascii_lowercase());
        if has_upper && has_lower {
            return Err(Error::InvalidAddress(
                "Mixed-case CashAddr".to_string(),
            ));
        }
        let lowered = address.to_ascii_lowercase();

        let (prefix, payload) = match lowered.split_once(':') {
            Some((p, rest)) => (p, rest),
            None => (expected_prefix, lowered.as_str()),
        };
        if prefix != expected_prefix {
            return Err(Error::InvalidAddress(format!(
                "Prefix {} does not belong to this network",
                prefix
            )));
        }

        let mut values = Vec::with_capacity(payload.len());
        for b in payload.bytes() {
            let v = CHARSET
                .iter()
                .position(|&c| c == b)
                .ok_or_else(|| Error::InvalidAddress("Bad CashAddr character".to_string()))?;
            values.push(v as u8);
        }
        if values.len() < 9 {
            return Err(Error::InvalidAddress("CashAddr too short".to_string()));
        }

        let mut checked: Vec<u8> = prefix.bytes().map(|b| b & 0x1f).collect();
        checked.push(0);
        checked.extend_from_slice(&values);
        if polymod(&checked) != 0 {
            return Err(Error::InvalidAddress("Bad CashAddr checksum".to_string()));
        }

        let data = &values[..values.len() - 8];
        let bytes = convert_bits(data, 5, 8, false)
            .ok_or_else(|| Error::InvalidAddress("Bad CashAddr padding".to_string()))?;
        if bytes.is_empty() {
            return Err(Error::InvalidAddress("Empty CashAddr payload".to_string()));
        }

        let version = bytes[0];
        let kind = match (version >> 3) & 0x0f {
            0 => CashAddrType::P2pkh,
            1 => CashAddrType::P2sh,
            other => {
                return Err(Error::InvalidAddress(format!(
                    "Unsupported CashAddr type {}",
                    other
                )))
            }
        };
        // Size code 0 means a 160-bit hash; longer hashes never occur in
        // payment addresses.
        if version & 0x07 != 0 || bytes.len() != 21 {
            return Err(Error::InvalidAddress(
                "Unsupported CashAddr hash size".to_string(),
            ));
        }

        Ok((kind, bytes[1..].to_vec()))
    }

    fn polymod(values: &[u8]) -> u64 {
        let mut c: u64 = 1;
        for &d in values {
            let c0 = (c >> 35) as u8;
            c = ((c & 0x0007_ffff_ffff) << 5) ^ u64::from(d);
            if c0 & 0x01 != 0 {
                c ^= 0x98_f2bc_8e61;
            }
            if c0 & 0x02 != 0 {
                c ^= 0x79_b76d_99e2;
            }
            if c0 & 0x04 != 0 {
                c ^= 0xf3_3e5f_b3c4;
            }
            if c0 & 0x08 != 0 {
                c ^= 0xae_2eab_e2a8;
            }
            if c0 & 0x10 != 0 {
                c ^= 0x1e_4f43_e470;
            }
        }
        c ^ 1
    }

    fn convert_bits(data: &[u8], from: u32, to: u32, pad: bool) -> Option<Vec<u8>> {
        let mut acc: u32 = 0;
        let mut bits: u32 = 0;
        let mut out = Vec::new();
        let max: u32 = (1 << to) - 1;

        for &value in data {
            if u32::from(value) >> from != 0 {
                return None;
            }
            acc = (acc << from) | u32::from(value);
            bits += from;
            while bits >= to {
                bits -= to;
                out.push(((acc >> bits) & max) as u8);
            }
        }

        if pad {
            if bits > 0 {
                out.push(((acc << (to - bits)) & max) as u8);
            }
        } else if bits >= from || (acc << (to - bits)) & max != 0 {
            return None;
        }

        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bech32::{Fe32, Hrp};

    const HASH20: [u8; 20] = [
        0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff,
        0x00, 0x11, 0x22, 0x33, 0x44,
    ];

    fn base58_with_version(version: u8) -> String {
        bs58::encode(HASH20).with_check_version(version).into_string()
    }

    fn segwit_v0(hrp: &str) -> String {
        bech32::segwit::encode(Hrp::parse(hrp).unwrap(), Fe32::Q, &HASH20).unwrap()
    }

    #[test]
    fn test_btc_mainnet_base58() {
        let validator = AddressValidator::new(NetworkType::Mainnet);
        // The genesis coinbase address.
        let addr = validator
            .validate(Currency::Btc, "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa")
            .unwrap();
        assert_eq!(addr.as_str(), "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa");
        assert_eq!(addr.currency(), Currency::Btc);

        let p2sh = base58_with_version(0x05);
        assert!(validator.validate(Currency::Btc, &p2sh).is_ok());
    }

    #[test]
    fn test_btc_network_mismatch() {
        let mainnet = AddressValidator::new(NetworkType::Mainnet);
        let testnet = AddressValidator::new(NetworkType::Testnet);

        let main_addr = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";
        assert!(testnet.validate(Currency::Btc, main_addr).is_err());

        let test_addr = base58_with_version(0x6f);
        assert!(testnet.validate(Currency::Btc, &test_addr).is_ok());
        assert!(mainnet.validate(Currency::Btc, &test_addr).is_err());
    }

    #[test]
    fn test_btc_segwit() {
        let mainnet = AddressValidator::new(NetworkType::Mainnet);
        let testnet = AddressValidator::new(NetworkType::Testnet);

        let main_addr = "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4";
        assert!(mainnet.validate(Currency::Btc, main_addr).is_ok());
        assert!(testnet.validate(Currency::Btc, main_addr).is_err());

        let test_addr = segwit_v0("tb");
        assert!(testnet.validate(Currency::Btc, &test_addr).is_ok());
        assert!(mainnet.validate(Currency::Btc, &test_addr).is_err());
    }

    #[test]
    fn test_ltc_mainnet() {
        let validator = AddressValidator::new(NetworkType::Mainnet);
        assert!(validator
            .validate(Currency::Ltc, &base58_with_version(0x30))
            .is_ok());
        assert!(validator
            .validate(Currency::Ltc, &base58_with_version(0x32))
            .is_ok());
        assert!(validator.validate(Currency::Ltc, &segwit_v0("ltc")).is_ok());
        // A Bitcoin address must not pass as Litecoin.
        assert!(validator
            .validate(Currency::Ltc, "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa")
            .is_err());
    }

    #[test]
    fn test_ltc_testnet_rejects_shared_btc_prefix() {
        let validator = AddressValidator::new(NetworkType::Testnet);

        // Bitcoin and Litecoin test networks share the 0x6f version byte.
        // The same string must validate for BTC and fail for LTC.
        let shared = base58_with_version(0x6f);
        assert!(validator.validate(Currency::Btc, &shared).is_ok());
        assert!(validator.validate(Currency::Ltc, &shared).is_err());

        assert!(validator
            .validate(Currency::Ltc, &base58_with_version(0x3a))
            .is_ok());
        assert!(validator.validate(Currency::Ltc, &segwit_v0("tltc")).is_ok());
    }

    #[test]
    fn test_bch_cashaddr_canonicalizes_to_legacy() {
        let validator = AddressValidator::new(NetworkType::Mainnet);

        // Reference vector: this CashAddr and legacy form name the same hash.
        let cash = "bitcoincash:qpm2qsznhks23z7629mms6s4cwef74vcwvy22gdx6a";
        let legacy = "1BpEi6DfDAUFd7GtittLSdBeYJvcoaVggu";

        let from_cash = validator.validate(Currency::Bch, cash).unwrap();
        assert_eq!(from_cash.as_str(), legacy);

        // Prefix-less payload decodes the same way.
        let bare = "qpm2qsznhks23z7629mms6s4cwef74vcwvy22gdx6a";
        assert_eq!(validator.validate(Currency::Bch, bare).unwrap().as_str(), legacy);

        // Legacy input is already canonical.
        let from_legacy = validator.validate(Currency::Bch, legacy).unwrap();
        assert_eq!(from_legacy.as_str(), legacy);
    }

    #[test]
    fn test_bch_rejects_damage() {
        let validator = AddressValidator::new(NetworkType::Mainnet);

        // Flip one payload character: checksum must catch it.
        let bad = "bitcoincash:qpm2qsznhks23z7629mms6s4cwef74vcwvy22gdx7a";
        assert!(validator.validate(Currency::Bch, bad).is_err());

        // Mixed case is invalid.
        let mixed = "bitcoincash:Qpm2qsznhks23z7629mms6s4cwef74vcwvy22gdx6a";
        assert!(validator.validate(Currency::Bch, mixed).is_err());

        // Mainnet prefix on the testnet validator.
        let testnet = AddressValidator::new(NetworkType::Testnet);
        let main = "bitcoincash:qpm2qsznhks23z7629mms6s4cwef74vcwvy22gdx6a";
        assert!(testnet.validate(Currency::Bch, main).is_err());
    }

    #[test]
    fn test_eth_checksummed() {
        let validator = AddressValidator::new(NetworkType::Mainnet);
        // EIP-55 reference addresses.
        for addr in [
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
            "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
            "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
        ] {
            let validated = validator.validate(Currency::Eth, addr).unwrap();
            assert_eq!(validated.as_str(), addr);
        }
    }

    #[test]
    fn test_eth_casing_rules() {
        let validator = AddressValidator::new(NetworkType::Mainnet);

        // All-lowercase carries no checksum and is accepted.
        let lower = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";
        assert!(validator.validate(Currency::Eth, lower).is_ok());

        // One flipped letter breaks the checksum casing.
        let flipped = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAeD";
        assert!(validator.validate(Currency::Eth, flipped).is_err());
    }

    #[test]
    fn test_eth_shape_errors() {
        let validator = AddressValidator::new(NetworkType::Mainnet);
        assert!(validator
            .validate(Currency::Eth, "5aaeb6053f3e94c9b9a09f33669435e7ef1beaed")
            .is_err());
        assert!(validator.validate(Currency::Eth, "0x1234").is_err());
        assert!(validator
            .validate(Currency::Eth, "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaeg")
            .is_err());
    }

    #[test]
    fn test_token_shares_account_rules() {
        let validator = AddressValidator::new(NetworkType::Mainnet);
        let addr = validator
            .validate(Currency::Dai, "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed")
            .unwrap();
        assert_eq!(addr.currency(), Currency::Dai);
        // And a Bitcoin address is never a token address.
        assert!(validator
            .validate(Currency::Dai, "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa")
            .is_err());
    }

    #[test]
    fn test_validate_opt_and_idempotence() {
        let validator = AddressValidator::new(NetworkType::Mainnet);

        assert!(validator.validate_opt(Currency::Btc, "garbage").is_none());

        let addr = validator
            .validate_opt(Currency::Btc, "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa")
            .unwrap();
        let again = validator
            .validate(Currency::Btc, addr.as_str())
            .unwrap();
        assert_eq!(again.as_str(), addr.as_str());
    }
}
