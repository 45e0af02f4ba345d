//! HTTP fee estimators
//!
//! Thin fetch-and-parse adapters over public fee APIs. Clamping and unit
//! scaling stay in the core oracle; these return raw quote units.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use purser_core::{Error, FeeEstimator, Result};

#[derive(Debug, Deserialize)]
struct RecommendedFees {
    #[serde(rename = "fastestFee")]
    fastest_fee: u64,
}

#[derive(Debug, Deserialize)]
struct GasStationReport {
    average: f64,
}

/// Estimator for the bitcoinfees recommended-fee API.
///
/// Reports `fastestFee`, in satoshis per byte.
pub struct BitcoinFeesEstimator {
    http: reqwest::Client,
    url: String,
}

impl BitcoinFeesEstimator {
    /// Estimator fetching from `url`
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            url: url.into(),
        })
    }
}

#[async_trait]
impl FeeEstimator for BitcoinFeesEstimator {
    async fn fetch(&self) -> Result<u128> {
        let body = fetch_text(&self.http, &self.url).await?;
        let rate = parse_recommended(&body)?;
        debug!(url = %self.url, rate, "fetched byte fee estimate");
        Ok(rate)
    }
}

/// Estimator for the gas-station API.
///
/// The API reports `average` in tenths of gwei; this divides by ten and
/// returns whole gwei.
pub struct GasStationEstimator {
    http: reqwest::Client,
    url: String,
}

impl GasStationEstimator {
    /// Estimator fetching from `url`
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            url: url.into(),
        })
    }
}

#[async_trait]
impl FeeEstimator for GasStationEstimator {
    async fn fetch(&self) -> Result<u128> {
        let body = fetch_text(&self.http, &self.url).await?;
        let rate = parse_gas_station(&body)?;
        debug!(url = %self.url, rate, "fetched gas price estimate");
        Ok(rate)
    }
}

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .build()
        .map_err(|e| Error::Network(format!("Failed to build HTTP client: {}", e)))
}

async fn fetch_text(http: &reqwest::Client, url: &str) -> Result<String> {
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| Error::Network(format!("Fee fetch from {} failed: {}", url, e)))?;
    response
        .text()
        .await
        .map_err(|e| Error::Network(format!("Fee response from {} unreadable: {}", url, e)))
}

fn parse_recommended(body: &str) -> Result<u128> {
    let fees: RecommendedFees = serde_json::from_str(body)?;
    Ok(u128::from(fees.fastest_fee))
}

fn parse_gas_station(body: &str) -> Result<u128> {
    let report: GasStationReport = serde_json::from_str(body)?;
    if !report.average.is_finite() || report.average < 0.0 {
        return Err(Error::InvalidAmount(format!(
            "Bad gas price report: {}",
            report.average
        )));
    }
    // Tenths of gwei, truncated to whole gwei.
    Ok((report.average / 10.0) as u128)
}
