//! Startup chain registration and lookup
//!
//! Every chain registers exactly once while the service boots. The frozen
//! registry is then handed to callers by reference; nothing can be added
//! or replaced at request time.

use std::collections::HashMap;
use std::sync::Arc;

use purser_core::{
    AccountNode, AddressValidator, Error, FeeEstimator, FeeOracle, Result, Signer,
};
use purser_node::{
    BitcoinFeesEstimator, BitcoindClient, EthNodeClient, GasStationEstimator, LocalSigner,
};
use purser_params::{ChainParams, Currency, NetworkType};
use tracing::info;
use zeroize::Zeroizing;

use crate::chains::{AccountChain, GasFunding, TokenChain, UtxoChain};
use crate::config::{
    AccountChainConfig, ServiceConfig, UtxoChainConfig, DEFAULT_BTC_FEE_URL, DEFAULT_GAS_PRICE_URL,
};
use crate::proxy::ChainProxy;

/// Collects chain registrations before the registry freezes
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    chains: HashMap<Currency, Arc<ChainProxy>>,
}

impl RegistryBuilder {
    /// Start an empty registration set
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one chain. A second registration for the same currency is
    /// a startup error, never a silent replacement.
    pub fn register(mut self, proxy: ChainProxy) -> Result<Self> {
        let currency = proxy.currency();
        if self.chains.contains_key(&currency) {
            return Err(Error::Configuration(format!(
                "A chain is already registered for {currency}"
            )));
        }
        self.chains.insert(currency, Arc::new(proxy));
        Ok(self)
    }

    /// Freeze into an immutable registry
    pub fn build(self) -> ChainRegistry {
        ChainRegistry {
            chains: self.chains,
        }
    }
}

/// Immutable currency-to-chain mapping built once at startup
pub struct ChainRegistry {
    chains: HashMap<Currency, Arc<ChainProxy>>,
}

impl std::fmt::Debug for ChainRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainRegistry")
            .field("currencies", &self.currencies())
            .finish()
    }
}

impl ChainRegistry {
    /// Start a registration set
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Wire a chain for every configured section.
    ///
    /// Incomplete sections fail here, before any request is served: a
    /// UTXO chain with neither a static fee nor an estimation source, or
    /// a token section without the account chain it rides on.
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        config.validate()?;
        let network = config.network;
        let signer: Arc<dyn Signer> = Arc::new(LocalSigner::new());
        let mut builder = Self::builder();

        let utxo_sections = [
            (Currency::Btc, &config.btc),
            (Currency::Ltc, &config.ltc),
            (Currency::Bch, &config.bch),
        ];
        for (currency, section) in utxo_sections {
            let Some(cfg) = section else { continue };
            builder = builder.register(wire_utxo_chain(currency, network, cfg, signer.clone())?)?;
            info!(currency = %currency, network = %network.name(), "Registered chain");
        }

        let mut account_node: Option<Arc<dyn AccountNode>> = None;
        if let Some(cfg) = &config.eth {
            let node: Arc<dyn AccountNode> = Arc::new(EthNodeClient::new(&cfg.rpc_url)?);
            let oracle = account_fee_oracle(network, cfg)?;
            let chain = AccountChain::new(
                Currency::Eth,
                network,
                node.clone(),
                oracle,
                signer.clone(),
                cfg.chain_id,
            );
            builder = builder.register(ChainProxy::Account(chain))?;
            info!(currency = %Currency::Eth, network = %network.name(), "Registered chain");
            account_node = Some(node);
        }

        if let Some(cfg) = &config.dai {
            // validate() already pairs the sections; both unwraps mirror it
            let (node, eth_cfg) = match (account_node, &config.eth) {
                (Some(node), Some(eth_cfg)) => (node, eth_cfg),
                _ => {
                    return Err(Error::Configuration(
                        "DAI is configured without the Ethereum node it runs on".to_string(),
                    ))
                }
            };
            let contract = AddressValidator::new(network)
                .validate(Currency::Dai, &cfg.contract)
                .map_err(|err| {
                    Error::Configuration(format!("DAI contract address is invalid: {err}"))
                })?;
            let funding = cfg
                .gas_reservoir_key
                .as_ref()
                .map(|key| GasFunding::new(Zeroizing::new(key.clone()), cfg.gas_funding));
            let oracle = account_fee_oracle(network, eth_cfg)?;
            let chain = TokenChain::new(
                Currency::Dai,
                network,
                node,
                oracle,
                signer.clone(),
                eth_cfg.chain_id,
                contract,
                funding,
            );
            builder = builder.register(ChainProxy::Token(chain))?;
            info!(currency = %Currency::Dai, network = %network.name(), "Registered chain");
        }

        Ok(builder.build())
    }

    /// Look up the chain for a currency
    pub fn get(&self, currency: Currency) -> Result<&Arc<ChainProxy>> {
        self.chains
            .get(&currency)
            .ok_or_else(|| Error::InvalidCurrency(format!("{currency} is not configured")))
    }

    /// Look up a chain by ticker symbol
    pub fn get_by_symbol(&self, symbol: &str) -> Result<&Arc<ChainProxy>> {
        let currency = Currency::from_symbol(symbol)
            .ok_or_else(|| Error::InvalidCurrency(symbol.to_string()))?;
        self.get(currency)
    }

    /// Currencies with a registered chain, in symbol order
    pub fn currencies(&self) -> Vec<Currency> {
        let mut list: Vec<Currency> = self.chains.keys().copied().collect();
        list.sort_by_key(|currency| currency.symbol());
        list
    }

    /// Number of registered chains
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    /// True when no chain is registered
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

fn wire_utxo_chain(
    currency: Currency,
    network: NetworkType,
    cfg: &UtxoChainConfig,
    signer: Arc<dyn Signer>,
) -> Result<ChainProxy> {
    let node = Arc::new(BitcoindClient::new(
        currency,
        &cfg.rpc_url,
        &cfg.rpc_user,
        &cfg.rpc_password,
    )?);
    let params = ChainParams::for_currency(currency, network);
    let oracle = FeeOracle::new(&params, cfg.static_fee, utxo_estimator(currency, cfg)?)?;
    Ok(ChainProxy::Utxo(UtxoChain::new(
        currency, network, node, oracle, signer,
    )))
}

fn utxo_estimator(
    currency: Currency,
    cfg: &UtxoChainConfig,
) -> Result<Option<Arc<dyn FeeEstimator>>> {
    if cfg.static_fee.is_some() {
        return Ok(None);
    }
    let url = match (&cfg.fee_url, currency) {
        (Some(url), _) => url.clone(),
        (None, Currency::Btc) => DEFAULT_BTC_FEE_URL.to_string(),
        // No public recommendation feed covers the forks; they need a
        // static fee, and FeeOracle::new reports the gap.
        (None, _) => return Ok(None),
    };
    Ok(Some(Arc::new(BitcoinFeesEstimator::new(url)?)))
}

fn account_fee_oracle(network: NetworkType, cfg: &AccountChainConfig) -> Result<FeeOracle> {
    let params = ChainParams::ethereum(network);
    let estimator: Option<Arc<dyn FeeEstimator>> = if cfg.static_gas_price.is_some() {
        None
    } else {
        let url = cfg
            .gas_price_url
            .clone()
            .unwrap_or_else(|| DEFAULT_GAS_PRICE_URL.to_string());
        Some(Arc::new(GasStationEstimator::new(url)?))
    };
    FeeOracle::new(&params, cfg.static_gas_price, estimator)
}
