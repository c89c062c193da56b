use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info};

use super::{round_to, TrendProvider, VolatilityProvider};
use crate::error::{Result, RiskSeerError};

pub const DEFAULT_COINGECKO_URL: &str = "https://api.coingecko.com/api/v3";

#[derive(Debug, Deserialize)]
struct MarketChart {
    #[serde(default)]
    prices: Vec<(f64, f64)>,
}

#[derive(Debug, Deserialize)]
struct CoinDetails {
    market_data: CoinMarketData,
}

#[derive(Debug, Deserialize)]
struct CoinMarketData {
    price_change_percentage_24h: Option<f64>,
}

/// Market data from the public CoinGecko API for a single asset.
#[derive(Debug, Clone)]
pub struct CoinGeckoClient {
    client: Client,
    base_url: String,
    asset_id: String,
}

impl CoinGeckoClient {
    pub fn new(base_url: impl Into<String>, asset_id: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            asset_id: asset_id.into().to_lowercase(),
        }
    }

    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(RiskSeerError::provider_error(format!(
                "CoinGecko returned {} for {}",
                response.status(),
                url
            )));
        }

        Ok(response.json::<T>().await?)
    }

    /// Current USD price of the asset.
    pub async fn spot_price(&self) -> Result<f64> {
        let url = format!(
            "{}/simple/price?ids={}&vs_currencies=usd",
            self.base_url, self.asset_id
        );
        let body: HashMap<String, HashMap<String, f64>> = self.get_json(&url).await?;

        body.get(&self.asset_id)
            .and_then(|quote| quote.get("usd"))
            .copied()
            .ok_or_else(|| {
                RiskSeerError::provider_error(format!("no USD price for {}", self.asset_id))
            })
    }
}

#[async_trait]
impl VolatilityProvider for CoinGeckoClient {
    async fn volatility(&self) -> Result<f64> {
        let url = format!(
            "{}/coins/{}/market_chart?vs_currency=usd&days=7",
            self.base_url, self.asset_id
        );
        let chart: MarketChart = self.get_json(&url).await?;
        let closes: Vec<f64> = chart.prices.iter().map(|(_, price)| *price).collect();

        let volatility = relative_volatility(&closes).ok_or_else(|| {
            RiskSeerError::provider_error(format!(
                "not enough price history for {} ({} points)",
                self.asset_id,
                closes.len()
            ))
        })?;

        info!("{} 7d volatility: {}", self.asset_id, volatility);
        Ok(volatility)
    }
}

#[async_trait]
impl TrendProvider for CoinGeckoClient {
    async fn market_trend(&self) -> Result<f64> {
        let url = format!("{}/coins/{}", self.base_url, self.asset_id);
        let details: CoinDetails = self.get_json(&url).await?;

        let change = details
            .market_data
            .price_change_percentage_24h
            .ok_or_else(|| RiskSeerError::provider_error("missing 24h price change"))?;

        let trend = change / 100.0;
        info!("{} 24h trend: {:.4}", self.asset_id, trend);
        Ok(trend)
    }
}

/// Sample standard deviation over mean, rounded to 4 places and clamped to [0, 1].
/// Returns `None` for fewer than two points or a non-positive mean.
pub fn relative_volatility(prices: &[f64]) -> Option<f64> {
    if prices.len() < 2 {
        return None;
    }

    let n = prices.len() as f64;
    let mean = prices.iter().sum::<f64>() / n;
    if mean <= 0.0 {
        return None;
    }

    let variance = prices.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(round_to(variance.sqrt() / mean, 4).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn relative_volatility_of_flat_series_is_zero() {
        assert_eq!(relative_volatility(&[2000.0, 2000.0, 2000.0]), Some(0.0));
    }

    #[test]
    fn relative_volatility_needs_two_points() {
        assert_eq!(relative_volatility(&[2000.0]), None);
        assert_eq!(relative_volatility(&[]), None);
    }

    #[test]
    fn relative_volatility_matches_sample_stdev() {
        // mean 2050, sample stdev 50
        let v = relative_volatility(&[2000.0, 2050.0, 2100.0]).unwrap();
        assert_eq!(v, 0.0244);
    }

    #[tokio::test]
    async fn trend_is_24h_change_as_fraction() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/coins/ethereum"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "market_data": { "price_change_percentage_24h": -4.5 }
            })))
            .mount(&server)
            .await;

        let client = CoinGeckoClient::new(server.uri(), "ethereum");
        let trend = client.market_trend().await.unwrap();
        assert!((trend - -0.045).abs() < 1e-12);
    }

    #[tokio::test]
    async fn spot_price_reads_usd_quote() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/simple/price"))
            .and(query_param("ids", "ethereum"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ethereum": { "usd": 2456.78 }
            })))
            .mount(&server)
            .await;

        let client = CoinGeckoClient::new(server.uri(), "ethereum");
        assert_eq!(client.spot_price().await.unwrap(), 2456.78);
    }

    #[tokio::test]
    async fn rate_limited_response_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = CoinGeckoClient::new(server.uri(), "ethereum");
        let err = client.volatility().await.unwrap_err();
        assert!(matches!(err, RiskSeerError::Provider(_)));
    }
}
