//! Error types for the payout core
//!
//! One taxonomy for every failure the dispatch layer can produce, so
//! callers can tell bad input from chain rejection from exhausted retries.

use std::fmt;

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Payout core errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Address failed chain-specific validation
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Currency symbol not registered or not supported
    #[error("Invalid currency: {0}")]
    InvalidCurrency(String),

    /// Amount malformed, zero, negative, or finer than the smallest unit
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Requested total exceeds what the sender can spend
    #[error("Insufficient funds: need {required} but have {available} smallest units")]
    InsufficientFunds {
        /// Smallest units the operation needed
        required: u128,
        /// Smallest units actually available
        available: u128,
    },

    /// Broadcast collided with a pending same-nonce transaction
    ///
    /// Raised by the transport on the node's distinguished rejection and
    /// re-raised by the account builder once the nonce-bump budget is spent,
    /// carrying the ids it already broadcast (those cannot be recalled).
    #[error("Replacement transaction underpriced after {attempts} attempt(s)")]
    UnderpricedReplacement {
        /// Broadcast attempts consumed
        attempts: u32,
        /// Transaction ids already accepted by the node in this send
        submitted: Vec<String>,
    },

    /// The node reported any other error
    #[error("Chain RPC error from {method}: {message}")]
    ChainRpc {
        /// RPC method that failed
        method: String,
        /// Error message the node returned
        message: String,
        /// Raw response body, kept for diagnosis
        raw: Option<serde_json::Value>,
    },

    /// Missing or contradictory configuration, fatal at startup
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Arithmetic crossed the integer range
    #[error("Amount overflow: {0}")]
    AmountOverflow(String),

    /// Key handling or transaction signing failed
    #[error("Signing error: {0}")]
    Signing(String),

    /// Transport-level failure before the node answered
    #[error("Network error: {0}")]
    Network(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Check if error is a user-facing error (vs internal or chain error)
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidAddress(_)
                | Error::InvalidCurrency(_)
                | Error::InvalidAmount(_)
                | Error::InsufficientFunds { .. }
        )
    }

    /// True for the distinguished underpriced-replacement condition
    pub fn is_underpriced(&self) -> bool {
        matches!(self, Error::UnderpricedReplacement { .. })
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Error::InvalidAddress(_) => {
                "The recipient address is invalid for this currency. Please check and try again."
                    .to_string()
            }
            Error::InvalidCurrency(symbol) => {
                format!("The currency {} is not supported.", symbol)
            }
            Error::InvalidAmount(_) => {
                "The amount is invalid. Please enter a valid amount.".to_string()
            }
            Error::InsufficientFunds { .. } => {
                "You don't have enough funds for this payment. Please check your balance and try again."
                    .to_string()
            }
            Error::UnderpricedReplacement { .. } => {
                "The network kept rejecting this payment as underpriced. Please try again later."
                    .to_string()
            }
            _ => self.to_string(),
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidAddress(_) | Error::InvalidCurrency(_) | Error::InvalidAmount(_) => {
                ErrorCategory::Validation
            }
            Error::InsufficientFunds { .. } | Error::AmountOverflow(_) => ErrorCategory::Funds,
            Error::UnderpricedReplacement { .. } => ErrorCategory::Retry,
            Error::ChainRpc { .. } => ErrorCategory::Chain,
            Error::Configuration(_) => ErrorCategory::Configuration,
            Error::Signing(_) => ErrorCategory::Signing,
            Error::Network(_) => ErrorCategory::Network,
            Error::Serialization(_) => ErrorCategory::Internal,
        }
    }
}

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed caller input
    Validation,
    /// Balance or amount-range problems
    Funds,
    /// Retry budget exhausted
    Retry,
    /// The chain rejected the request
    Chain,
    /// Startup configuration problems
    Configuration,
    /// Key or signature problems
    Signing,
    /// Transport problems
    Network,
    /// Internal/system errors
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Validation => write!(f, "Validation"),
            ErrorCategory::Funds => write!(f, "Funds"),
            ErrorCategory::Retry => write!(f, "Retry"),
            ErrorCategory::Chain => write!(f, "Chain"),
            ErrorCategory::Configuration => write!(f, "Configuration"),
            ErrorCategory::Signing => write!(f, "Signing"),
            ErrorCategory::Network => write!(f, "Network"),
            ErrorCategory::Internal => write!(f, "Internal"),
        }
    }
}
