//! Supported currencies

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Closed set of supported currencies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    /// Bitcoin, the base UTXO chain
    Btc,
    /// Litecoin, UTXO fork
    Ltc,
    /// Bitcoin Cash, UTXO fork addressed in legacy Base58 on the wire
    Bch,
    /// Ethereum, the base account chain
    Eth,
    /// Dai, an 18-decimal token contract on the account chain
    Dai,
}

impl Currency {
    /// Every supported currency, in registration order
    pub const ALL: [Currency; 5] = [
        Currency::Btc,
        Currency::Ltc,
        Currency::Bch,
        Currency::Eth,
        Currency::Dai,
    ];

    /// Ticker symbol
    pub const fn symbol(&self) -> &'static str {
        match self {
            Currency::Btc => "BTC",
            Currency::Ltc => "LTC",
            Currency::Bch => "BCH",
            Currency::Eth => "ETH",
            Currency::Dai => "DAI",
        }
    }

    /// Parse a ticker symbol (case-sensitive, upper-case)
    pub fn from_symbol(symbol: &str) -> Option<Currency> {
        match symbol {
            "BTC" => Some(Currency::Btc),
            "LTC" => Some(Currency::Ltc),
            "BCH" => Some(Currency::Bch),
            "ETH" => Some(Currency::Eth),
            "DAI" => Some(Currency::Dai),
            _ => None,
        }
    }

    /// Number of decimal places in the chain-native unit
    pub const fn decimals(&self) -> u32 {
        match self {
            Currency::Btc | Currency::Ltc | Currency::Bch => 8,
            Currency::Eth | Currency::Dai => 18,
        }
    }

    /// Smallest units per whole chain-native unit
    pub const fn base_unit_scale(&self) -> u128 {
        10u128.pow(self.decimals())
    }

    /// True for chains that account in discrete unspent outputs
    pub const fn is_utxo(&self) -> bool {
        matches!(self, Currency::Btc | Currency::Ltc | Currency::Bch)
    }

    /// True for the token layered on the account chain
    pub const fn is_token(&self) -> bool {
        matches!(self, Currency::Dai)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Currency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Currency::from_symbol(s).ok_or_else(|| Error::UnknownSymbol(s.to_string()))
    }
}
