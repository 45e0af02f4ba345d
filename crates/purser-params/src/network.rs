//! Per-chain network parameters

use serde::{Deserialize, Serialize};

use crate::currency::Currency;
use crate::{Error, Result};

/// Gas limit for a plain value transfer on the account chain
pub const GAS_PLAIN_TRANSFER: u64 = 21_000;

/// Gas limit when the destination carries deployed code
pub const GAS_CONTRACT_CALL: u64 = 50_000;

/// Gas limit for a token-contract transfer call
pub const GAS_TOKEN_TRANSFER: u64 = 100_000;

/// Ceiling for oracle-quoted UTXO fee rates, in satoshi per byte
pub const UTXO_FEE_CEILING: u128 = 100;

/// Ceiling for oracle-quoted gas prices, in gwei
pub const GAS_PRICE_CEILING_GWEI: u128 = 100;

/// Multiplier from a gwei quote to wei
pub const GWEI_IN_WEI: u128 = 1_000_000_000;

/// Network type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    /// Mainnet
    Mainnet,
    /// Testnet
    Testnet,
}

impl NetworkType {
    /// Parse a network name as it appears in configuration
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "mainnet" => Ok(NetworkType::Mainnet),
            "testnet" => Ok(NetworkType::Testnet),
            _ => Err(Error::UnknownNetwork(name.to_string())),
        }
    }

    /// Human-readable name
    pub const fn name(&self) -> &'static str {
        match self {
            NetworkType::Mainnet => "mainnet",
            NetworkType::Testnet => "testnet",
        }
    }
}

/// Address and fee parameters for one currency on one network
#[derive(Debug, Clone)]
pub struct ChainParams {
    /// Network these parameters apply to
    pub network: NetworkType,
    /// Human-readable chain name
    pub name: &'static str,
    /// Base58Check version byte for pay-to-pubkey-hash addresses
    pub p2pkh_prefix: Option<u8>,
    /// Base58Check version byte for pay-to-script-hash addresses
    pub p2sh_prefix: Option<u8>,
    /// WIF private key prefix
    pub wif_prefix: Option<u8>,
    /// Bech32 human-readable part, for chains with a segwit address form
    pub bech32_hrp: Option<&'static str>,
    /// CashAddr human-readable part, for chains addressed in CashAddr
    pub cashaddr_hrp: Option<&'static str>,
    /// Ceiling applied to oracle fee quotes, in quote units
    pub fee_ceiling: u128,
    /// Multiplier from quote units to smallest units
    pub fee_unit_scale: u128,
}

impl ChainParams {
    /// Bitcoin parameters
    pub const fn bitcoin(network: NetworkType) -> Self {
        match network {
            NetworkType::Mainnet => Self {
                network,
                name: "bitcoin",
                p2pkh_prefix: Some(0x00),
                p2sh_prefix: Some(0x05),
                wif_prefix: Some(0x80),
                bech32_hrp: Some("bc"),
                cashaddr_hrp: None,
                fee_ceiling: UTXO_FEE_CEILING,
                fee_unit_scale: 1,
            },
            NetworkType::Testnet => Self {
                network,
                name: "bitcoin",
                p2pkh_prefix: Some(0x6f),
                p2sh_prefix: Some(0xc4),
                wif_prefix: Some(0xef),
                bech32_hrp: Some("tb"),
                cashaddr_hrp: None,
                fee_ceiling: UTXO_FEE_CEILING,
                fee_unit_scale: 1,
            },
        }
    }

    /// Litecoin parameters
    ///
    /// Testnet deliberately omits the Base58 P2PKH version byte: it is the
    /// same byte Bitcoin testnet uses, and accepting it would let a Bitcoin
    /// testnet address pass as Litecoin. The bech32 form covers P2PKH.
    pub const fn litecoin(network: NetworkType) -> Self {
        match network {
            NetworkType::Mainnet => Self {
                network,
                name: "litecoin",
                p2pkh_prefix: Some(0x30),
                p2sh_prefix: Some(0x32),
                wif_prefix: Some(0xb0),
                bech32_hrp: Some("ltc"),
                cashaddr_hrp: None,
                fee_ceiling: UTXO_FEE_CEILING,
                fee_unit_scale: 1,
            },
            NetworkType::Testnet => Self {
                network,
                name: "litecoin",
                p2pkh_prefix: None,
                p2sh_prefix: Some(0x3a),
                wif_prefix: Some(0xef),
                bech32_hrp: Some("tltc"),
                cashaddr_hrp: None,
                fee_ceiling: UTXO_FEE_CEILING,
                fee_unit_scale: 1,
            },
        }
    }

    /// Bitcoin Cash parameters (legacy Base58 plus CashAddr)
    pub const fn bitcoin_cash(network: NetworkType) -> Self {
        match network {
            NetworkType::Mainnet => Self {
                network,
                name: "bitcoin-cash",
                p2pkh_prefix: Some(0x00),
                p2sh_prefix: Some(0x05),
                wif_prefix: Some(0x80),
                bech32_hrp: None,
                cashaddr_hrp: Some("bitcoincash"),
                fee_ceiling: UTXO_FEE_CEILING,
                fee_unit_scale: 1,
            },
            NetworkType::Testnet => Self {
                network,
                name: "bitcoin-cash",
                p2pkh_prefix: Some(0x6f),
                p2sh_prefix: Some(0xc4),
                wif_prefix: Some(0xef),
                bech32_hrp: None,
                cashaddr_hrp: Some("bchtest"),
                fee_ceiling: UTXO_FEE_CEILING,
                fee_unit_scale: 1,
            },
        }
    }

    /// Ethereum parameters, shared by the token chain
    pub const fn ethereum(network: NetworkType) -> Self {
        Self {
            network,
            name: "ethereum",
            p2pkh_prefix: None,
            p2sh_prefix: None,
            wif_prefix: None,
            bech32_hrp: None,
            cashaddr_hrp: None,
            fee_ceiling: GAS_PRICE_CEILING_GWEI,
            fee_unit_scale: GWEI_IN_WEI,
        }
    }

    /// Parameters for a currency on a network
    pub const fn for_currency(currency: Currency, network: NetworkType) -> Self {
        match currency {
            Currency::Btc => Self::bitcoin(network),
            Currency::Ltc => Self::litecoin(network),
            Currency::Bch => Self::bitcoin_cash(network),
            Currency::Eth | Currency::Dai => Self::ethereum(network),
        }
    }

    /// True when `version` is this chain's P2PKH or P2SH byte
    pub const fn accepts_base58_version(&self, version: u8) -> bool {
        let p2pkh = matches!(self.p2pkh_prefix, Some(v) if v == version);
        let p2sh = matches!(self.p2sh_prefix, Some(v) if v == version);
        p2pkh || p2sh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitcoin_params() {
        let params = ChainParams::bitcoin(NetworkType::Mainnet);
        assert_eq!(params.p2pkh_prefix, Some(0x00));
        assert_eq!(params.bech32_hrp, Some("bc"));
        assert!(params.accepts_base58_version(0x05));
        assert!(!params.accepts_base58_version(0x6f));
    }

    #[test]
    fn test_litecoin_testnet_excludes_shared_p2pkh_byte() {
        let params = ChainParams::litecoin(NetworkType::Testnet);
        // 0x6f belongs to Bitcoin testnet; Litecoin testnet must not take it.
        assert!(!params.accepts_base58_version(0x6f));
        assert!(params.accepts_base58_version(0x3a));
        assert_eq!(params.bech32_hrp, Some("tltc"));
    }

    #[test]
    fn test_bitcoin_cash_has_cashaddr_only() {
        let main = ChainParams::bitcoin_cash(NetworkType::Mainnet);
        assert_eq!(main.cashaddr_hrp, Some("bitcoincash"));
        assert_eq!(main.bech32_hrp, None);
        let test = ChainParams::bitcoin_cash(NetworkType::Testnet);
        assert_eq!(test.cashaddr_hrp, Some("bchtest"));
    }

    #[test]
    fn test_token_uses_ethereum_params() {
        let params = ChainParams::for_currency(Currency::Dai, NetworkType::Mainnet);
        assert_eq!(params.name, "ethereum");
        assert_eq!(params.fee_unit_scale, GWEI_IN_WEI);
        assert_eq!(params.fee_ceiling, GAS_PRICE_CEILING_GWEI);
    }

    #[test]
    fn test_network_names() {
        assert_eq!(NetworkType::from_name("mainnet").unwrap(), NetworkType::Mainnet);
        assert!(NetworkType::from_name("regtest").is_err());
    }
}
