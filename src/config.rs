use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::enrichment::DEFAULT_PROVIDER_TIMEOUT;
use crate::error::{Result, RiskSeerError};
use crate::providers::aave::DEFAULT_AAVE_SUBGRAPH_URL;
use crate::providers::coingecko::DEFAULT_COINGECKO_URL;
use crate::scoring::gateway::{DEFAULT_CLOUD_MODEL, DEFAULT_ENDPOINT_TIMEOUT};
use crate::scoring::{EndpointDescriptor, EndpointShape};

pub const DEFAULT_SCORING_ENDPOINT: &str = "http://127.0.0.1:8001";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub scoring_endpoints: Vec<EndpointDescriptor>,
    pub api_key: Option<String>,
    pub cloud_model: String,
    pub endpoint_timeout_secs: u64,
    pub provider_timeout_secs: u64,

    // Enrichment data sources
    pub live_data: bool,
    pub coingecko_url: String,
    pub aave_subgraph_url: String,
    pub asset_id: String,

    // Wallet monitoring
    pub alert_threshold: f64,
    pub monitor_interval_secs: u64,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scoring_endpoints: vec![EndpointDescriptor::local_mock(DEFAULT_SCORING_ENDPOINT)],
            api_key: None,
            cloud_model: DEFAULT_CLOUD_MODEL.to_string(),
            endpoint_timeout_secs: DEFAULT_ENDPOINT_TIMEOUT.as_secs(),
            provider_timeout_secs: DEFAULT_PROVIDER_TIMEOUT.as_secs(),
            live_data: false,
            coingecko_url: DEFAULT_COINGECKO_URL.to_string(),
            aave_subgraph_url: DEFAULT_AAVE_SUBGRAPH_URL.to_string(),
            asset_id: "ethereum".to_string(),
            alert_threshold: 70.0,
            monitor_interval_secs: 30,
            telegram_bot_token: None,
            telegram_chat_id: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.scoring_endpoints.is_empty() {
            return Err(RiskSeerError::config_error("no scoring endpoints configured"));
        }

        if self.endpoint_timeout_secs == 0 || self.provider_timeout_secs == 0 {
            return Err(RiskSeerError::config_error("timeouts must be at least 1 second"));
        }

        if self.monitor_interval_secs == 0 {
            return Err(RiskSeerError::config_error("monitor interval must be at least 1 second"));
        }

        if !(0.0..=100.0).contains(&self.alert_threshold) {
            return Err(RiskSeerError::config_error(format!(
                "alert threshold {} outside [0, 100]",
                self.alert_threshold
            )));
        }

        Ok(())
    }
}

/// Comma-separated endpoint list, each entry optionally prefixed `cloud=` or `mock=`.
pub fn parse_endpoints(raw: &str) -> Result<Vec<EndpointDescriptor>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(EndpointDescriptor::from_str)
        .collect()
}

fn var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T: FromStr>(key: &str) -> Result<Option<T>> {
    match var(key) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| RiskSeerError::config_error(format!("invalid value for {}: {}", key, raw))),
        None => Ok(None),
    }
}

pub async fn load_config() -> Result<Config> {
    let mut config = Config::default();

    // Override defaults with environment variables
    if let Some(raw) = var("SCORING_ENDPOINTS").or_else(|| var("ASI_ENDPOINT")) {
        config.scoring_endpoints = parse_endpoints(&raw)?;
    }

    config.api_key = var("ASI_API_KEY");

    if let Some(model) = var("CLOUD_MODEL") {
        config.cloud_model = model;
    }

    if let Some(secs) = parse_var("ENDPOINT_TIMEOUT_SECS")? {
        config.endpoint_timeout_secs = secs;
    }

    if let Some(secs) = parse_var("PROVIDER_TIMEOUT_SECS")? {
        config.provider_timeout_secs = secs;
    }

    if let Some(live) = parse_var("LIVE_DATA")? {
        config.live_data = live;
    }

    if let Some(url) = var("COINGECKO_API_URL") {
        config.coingecko_url = url;
    }

    if let Some(url) = var("AAVE_SUBGRAPH_URL") {
        config.aave_subgraph_url = url;
    }

    if let Some(asset) = var("ASSET_ID") {
        config.asset_id = asset;
    }

    if let Some(threshold) = parse_var("ALERT_THRESHOLD")? {
        config.alert_threshold = threshold;
    }

    if let Some(secs) = parse_var("SCHED_INTERVAL_SECONDS")? {
        config.monitor_interval_secs = secs;
    }

    config.telegram_bot_token = var("TELEGRAM_BOT_TOKEN");
    config.telegram_chat_id = var("TELEGRAM_CHAT_ID");

    config.validate()?;

    info!(
        "Loaded configuration: {} scoring endpoint(s), live data {}",
        config.scoring_endpoints.len(),
        config.live_data
    );
    if config.api_key.is_none()
        && config
            .scoring_endpoints
            .iter()
            .any(|e| e.shape == EndpointShape::Cloud)
    {
        warn!("Cloud scoring endpoint configured without ASI_API_KEY");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scoring_endpoints[0].url, DEFAULT_SCORING_ENDPOINT);
        assert_eq!(config.scoring_endpoints[0].shape, EndpointShape::LocalMock);
    }

    #[test]
    fn endpoint_list_keeps_order_and_shapes() {
        let endpoints =
            parse_endpoints("https://api.asi1.ai/v1/chat/completions, mock=http://localhost:8001/analyze,")
                .unwrap();
        assert_eq!(endpoints.len(), 2);
        assert_eq!(endpoints[0].shape, EndpointShape::Cloud);
        assert_eq!(endpoints[1].shape, EndpointShape::LocalMock);
        assert_eq!(endpoints[1].url, "http://localhost:8001/analyze");
    }

    #[test]
    fn bad_endpoint_is_config_error() {
        assert!(matches!(
            parse_endpoints("localhost:8001"),
            Err(RiskSeerError::Config(_))
        ));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let config = Config {
            scoring_endpoints: Vec::new(),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            alert_threshold: 120.0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            endpoint_timeout_secs: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
