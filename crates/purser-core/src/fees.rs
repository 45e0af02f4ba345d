//! Fee resolution
//!
//! Each chain gets one [`FeeOracle`]. A configured static rate always wins
//! and is used exactly as given. Otherwise the oracle asks its estimator
//! and clamps the answer to the chain's ceiling before scaling it into
//! smallest units.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use purser_params::ChainParams;
use tracing::{debug, warn};

use crate::{Error, Result};

/// External fee-estimation source.
///
/// Implementations return a rate in the chain's quote units (satoshis per
/// byte for UTXO chains, gwei for account chains). Scaling into smallest
/// units is the oracle's job.
#[async_trait]
pub trait FeeEstimator: Send + Sync {
    /// Fetch the currently recommended rate, in quote units
    async fn fetch(&self) -> Result<u128>;
}

/// Where a fee quote came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeSource {
    /// Operator-configured static rate, used verbatim
    Static,
    /// Live estimator, clamped to the chain ceiling
    Oracle,
}

/// A resolved per-unit fee rate, in smallest units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeQuote {
    /// Rate in smallest units per fee unit (per byte, or per gas)
    pub rate: u128,
    /// Provenance of the rate
    pub source: FeeSource,
}

/// Resolves the per-unit fee rate for one chain
#[derive(Clone)]
pub struct FeeOracle {
    chain: &'static str,
    static_rate: Option<u128>,
    ceiling: u128,
    unit_scale: u128,
    estimator: Option<Arc<dyn FeeEstimator>>,
}

impl fmt::Debug for FeeOracle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeeOracle")
            .field("chain", &self.chain)
            .field("static_rate", &self.static_rate)
            .field("ceiling", &self.ceiling)
            .field("unit_scale", &self.unit_scale)
            .field("has_estimator", &self.estimator.is_some())
            .finish()
    }
}

impl FeeOracle {
    /// Create an oracle with at least one fee source.
    ///
    /// Returns [`Error::Configuration`] when neither a static rate nor an
    /// estimator is supplied, so a misconfigured chain fails at startup
    /// rather than on the first send.
    pub fn new(
        params: &ChainParams,
        static_rate: Option<u128>,
        estimator: Option<Arc<dyn FeeEstimator>>,
    ) -> Result<Self> {
        if static_rate.is_none() && estimator.is_none() {
            return Err(Error::Configuration(format!(
                "No fee source for {}: set a static rate or an estimator",
                params.name
            )));
        }
        Ok(Self {
            chain: params.name,
            static_rate,
            ceiling: params.fee_ceiling,
            unit_scale: params.fee_unit_scale,
            estimator,
        })
    }

    /// Oracle that always uses a fixed operator-supplied rate
    pub fn with_static_rate(params: &ChainParams, rate: u128) -> Self {
        Self {
            chain: params.name,
            static_rate: Some(rate),
            ceiling: params.fee_ceiling,
            unit_scale: params.fee_unit_scale,
            estimator: None,
        }
    }

    /// Oracle backed by a live estimator
    pub fn with_estimator(params: &ChainParams, estimator: Arc<dyn FeeEstimator>) -> Self {
        Self {
            chain: params.name,
            static_rate: None,
            ceiling: params.fee_ceiling,
            unit_scale: params.fee_unit_scale,
            estimator: Some(estimator),
        }
    }

    /// Resolve the current rate in smallest units.
    ///
    /// A static rate bypasses the estimator entirely and is never clamped.
    /// Estimated rates are capped at the chain ceiling.
    pub async fn quote(&self) -> Result<FeeQuote> {
        if let Some(rate) = self.static_rate {
            let scaled = self.scale(rate)?;
            debug!(chain = self.chain, rate = scaled, "using static fee rate");
            return Ok(FeeQuote {
                rate: scaled,
                source: FeeSource::Static,
            });
        }
        let estimator = self.estimator.as_ref().ok_or_else(|| {
            Error::Configuration(format!("No fee source for {}", self.chain))
        })?;
        let observed = estimator.fetch().await?;
        let clamped = observed.min(self.ceiling);
        if clamped < observed {
            warn!(
                chain = self.chain,
                observed,
                ceiling = self.ceiling,
                "clamping estimated fee rate to ceiling"
            );
        }
        let scaled = self.scale(clamped)?;
        debug!(chain = self.chain, rate = scaled, "using estimated fee rate");
        Ok(FeeQuote {
            rate: scaled,
            source: FeeSource::Oracle,
        })
    }

    fn scale(&self, rate: u128) -> Result<u128> {
        rate.checked_mul(self.unit_scale)
            .ok_or_else(|| Error::AmountOverflow(format!("Fee rate out of range for {}", self.chain)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FixedEstimator {
        rate: u128,
        calls: AtomicU32,
    }

    impl FixedEstimator {
        fn new(rate: u128) -> Self {
            Self {
                rate,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl FeeEstimator for FixedEstimator {
        async fn fetch(&self) -> Result<u128> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.rate)
        }
    }

    #[tokio::test]
    async fn test_static_rate_bypasses_estimator() {
        let estimator = Arc::new(FixedEstimator::new(40));
        let oracle = FeeOracle::new(
            &ChainParams::bitcoin(purser_params::NetworkType::Mainnet),
            Some(25),
            Some(estimator.clone()),
        )
        .unwrap();

        let quote = oracle.quote().await.unwrap();
        assert_eq!(quote.rate, 25);
        assert_eq!(quote.source, FeeSource::Static);
        assert_eq!(estimator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_static_rate_is_never_clamped() {
        let params = ChainParams::bitcoin(purser_params::NetworkType::Mainnet);
        let oracle = FeeOracle::with_static_rate(&params, params.fee_ceiling + 400);

        let quote = oracle.quote().await.unwrap();
        assert_eq!(quote.rate, params.fee_ceiling + 400);
        assert_eq!(quote.source, FeeSource::Static);
    }

    #[tokio::test]
    async fn test_estimate_below_ceiling_passes_through() {
        let params = ChainParams::bitcoin(purser_params::NetworkType::Mainnet);
        let oracle = FeeOracle::with_estimator(&params, Arc::new(FixedEstimator::new(37)));

        let quote = oracle.quote().await.unwrap();
        assert_eq!(quote.rate, 37);
        assert_eq!(quote.source, FeeSource::Oracle);
    }

    #[tokio::test]
    async fn test_estimate_above_ceiling_is_clamped() {
        let params = ChainParams::bitcoin(purser_params::NetworkType::Mainnet);
        let oracle = FeeOracle::with_estimator(&params, Arc::new(FixedEstimator::new(100_000)));

        let quote = oracle.quote().await.unwrap();
        assert_eq!(quote.rate, params.fee_ceiling);
    }

    #[tokio::test]
    async fn test_account_rates_scale_to_smallest_units() {
        // Gwei quotes become wei.
        let params = ChainParams::ethereum(purser_params::NetworkType::Mainnet);
        let oracle = FeeOracle::with_estimator(&params, Arc::new(FixedEstimator::new(12)));

        let quote = oracle.quote().await.unwrap();
        assert_eq!(quote.rate, 12_000_000_000);
    }

    #[test]
    fn test_no_source_is_a_configuration_error() {
        let params = ChainParams::bitcoin(purser_params::NetworkType::Mainnet);
        let err = FeeOracle::new(&params, None, None).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
