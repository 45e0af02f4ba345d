//! Service configuration
//!
//! Settings load from `PURSER_*` environment variables or a JSON document
//! and are validated before any chain is wired up, so a bad deployment
//! fails at startup rather than on the first payment.

use std::env;
use std::fmt;

use purser_core::{Error, Result};
use purser_params::NetworkType;
use rust_decimal::Decimal;
use serde::Deserialize;

/// Fee recommendation endpoint used for Bitcoin when none is configured
pub const DEFAULT_BTC_FEE_URL: &str = "https://bitcoinfees.earn.com/api/v1/fees/recommended";

/// Gas price endpoint used for the account chains when none is configured
pub const DEFAULT_GAS_PRICE_URL: &str = "https://ethgasstation.info/json/ethgasAPI.json";

fn default_gas_funding() -> Decimal {
    // 0.1 ether, enough gas money for a fresh token wallet
    Decimal::new(1, 1)
}

/// Connection and fee settings for one UTXO chain node
#[derive(Debug, Clone, Deserialize)]
pub struct UtxoChainConfig {
    /// Bitcoin-Core-style JSON-RPC endpoint
    pub rpc_url: String,
    /// RPC basic-auth user
    #[serde(default)]
    pub rpc_user: String,
    /// RPC basic-auth password
    #[serde(default)]
    pub rpc_password: String,
    /// Operator-fixed fee rate in satoshi per byte; bypasses estimation
    #[serde(default)]
    pub static_fee: Option<u128>,
    /// Fee recommendation endpoint; ignored when a static fee is set
    #[serde(default)]
    pub fee_url: Option<String>,
}

/// Connection and gas settings for the account chain node
#[derive(Debug, Clone, Deserialize)]
pub struct AccountChainConfig {
    /// Ethereum-style JSON-RPC endpoint
    pub rpc_url: String,
    /// Chain id signed into every transaction
    pub chain_id: u64,
    /// Operator-fixed gas price in gwei; bypasses estimation
    #[serde(default)]
    pub static_gas_price: Option<u128>,
    /// Gas price endpoint; ignored when a static price is set
    #[serde(default)]
    pub gas_price_url: Option<String>,
}

/// Settings for the token contract riding the account chain
#[derive(Clone, Deserialize)]
pub struct TokenChainConfig {
    /// Deployed token contract address
    pub contract: String,
    /// Private key of the wallet that grants gas money to new wallets
    #[serde(default)]
    pub gas_reservoir_key: Option<String>,
    /// Ether granted to each new wallet from the reservoir
    #[serde(default = "default_gas_funding")]
    pub gas_funding: Decimal,
}

impl fmt::Debug for TokenChainConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenChainConfig")
            .field("contract", &self.contract)
            .field("has_gas_reservoir", &self.gas_reservoir_key.is_some())
            .field("gas_funding", &self.gas_funding)
            .finish()
    }
}

/// Top-level service settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Network every configured chain runs on
    pub network: NetworkType,
    /// Bitcoin section
    pub btc: Option<UtxoChainConfig>,
    /// Litecoin section
    pub ltc: Option<UtxoChainConfig>,
    /// Bitcoin Cash section
    pub bch: Option<UtxoChainConfig>,
    /// Ethereum section
    pub eth: Option<AccountChainConfig>,
    /// Token section; requires the Ethereum section
    pub dai: Option<TokenChainConfig>,
}

impl ServiceConfig {
    /// Parse and validate a JSON settings document
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate settings from `PURSER_*` environment variables.
    ///
    /// A chain section exists when its anchor variable is set:
    /// `PURSER_BTC_RPC_URL` and friends for the UTXO chains,
    /// `PURSER_ETH_RPC_URL` for Ethereum, `PURSER_DAI_CONTRACT` for the
    /// token. `PURSER_NETWORK` defaults to mainnet.
    pub fn from_env() -> Result<Self> {
        let network = match env_opt("PURSER_NETWORK") {
            Some(name) => NetworkType::from_name(&name)
                .map_err(|err| Error::Configuration(err.to_string()))?,
            None => NetworkType::Mainnet,
        };

        let config = Self {
            network,
            btc: utxo_section("BTC")?,
            ltc: utxo_section("LTC")?,
            bch: utxo_section("BCH")?,
            eth: account_section()?,
            dai: token_section()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that cannot produce a working registry
    pub fn validate(&self) -> Result<()> {
        let utxo_sections = [("BTC", &self.btc), ("LTC", &self.ltc), ("BCH", &self.bch)];
        for (symbol, section) in utxo_sections {
            if let Some(cfg) = section {
                if cfg.rpc_url.is_empty() {
                    return Err(Error::Configuration(format!("{symbol} rpc_url is empty")));
                }
            }
        }
        if let Some(cfg) = &self.eth {
            if cfg.rpc_url.is_empty() {
                return Err(Error::Configuration("ETH rpc_url is empty".to_string()));
            }
        }
        if let Some(cfg) = &self.dai {
            if self.eth.is_none() {
                return Err(Error::Configuration(
                    "DAI is configured without the Ethereum node it runs on".to_string(),
                ));
            }
            if cfg.contract.is_empty() {
                return Err(Error::Configuration("DAI contract is empty".to_string()));
            }
            if cfg.gas_funding <= Decimal::ZERO {
                return Err(Error::Configuration(
                    "DAI gas_funding must be positive".to_string(),
                ));
            }
        }
        Ok(())
    }
}

fn env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match env_opt(name) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| Error::Configuration(format!("{name} has an unparseable value: {raw}"))),
    }
}

fn utxo_section(prefix: &str) -> Result<Option<UtxoChainConfig>> {
    let Some(rpc_url) = env_opt(&format!("PURSER_{prefix}_RPC_URL")) else {
        return Ok(None);
    };
    Ok(Some(UtxoChainConfig {
        rpc_url,
        rpc_user: env_opt(&format!("PURSER_{prefix}_RPC_USER")).unwrap_or_default(),
        rpc_password: env_opt(&format!("PURSER_{prefix}_RPC_PASSWORD")).unwrap_or_default(),
        static_fee: env_parse(&format!("PURSER_{prefix}_FEE"))?,
        fee_url: env_opt(&format!("PURSER_{prefix}_FEE_URL")),
    }))
}

fn account_section() -> Result<Option<AccountChainConfig>> {
    let Some(rpc_url) = env_opt("PURSER_ETH_RPC_URL") else {
        return Ok(None);
    };
    let chain_id = env_parse("PURSER_ETH_CHAIN_ID")?.ok_or_else(|| {
        Error::Configuration("PURSER_ETH_CHAIN_ID is required with PURSER_ETH_RPC_URL".to_string())
    })?;
    Ok(Some(AccountChainConfig {
        rpc_url,
        chain_id,
        static_gas_price: env_parse("PURSER_ETH_GAS_PRICE")?,
        gas_price_url: env_opt("PURSER_ETH_GAS_URL"),
    }))
}

fn token_section() -> Result<Option<TokenChainConfig>> {
    let Some(contract) = env_opt("PURSER_DAI_CONTRACT") else {
        return Ok(None);
    };
    Ok(Some(TokenChainConfig {
        contract,
        gas_reservoir_key: env_opt("PURSER_DAI_RESERVOIR_KEY"),
        gas_funding: env_parse("PURSER_DAI_GAS_FUNDING")?.unwrap_or_else(default_gas_funding),
    }))
}
