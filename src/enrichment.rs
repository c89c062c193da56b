//! Fills missing features from the data providers.
//!
//! Provider calls run concurrently. Each branch resolves to its own
//! `Result`, so one slow or failing provider never affects its siblings, and
//! nothing is merged until every branch has finished.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::OptionFuture;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Result, RiskSeerError};
use crate::features::{Feature, FeatureSet, PartialFeatures};
use crate::providers::{
    AaveSubgraphClient, CoinGeckoClient, PositionProvider, PositionSnapshot, SimulatedMarketData,
    TrendProvider, VolatilityProvider,
};

pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

/// Which provider calls a partial feature set needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentRequest {
    pub volatility: bool,
    pub market_trend: bool,
    /// Wallet to look up; set only if collateral ratio or leverage is missing.
    pub position_wallet: Option<String>,
}

impl EnrichmentRequest {
    pub fn for_features(partial: &PartialFeatures) -> Self {
        let position_missing =
            partial.collateral_ratio.is_none() || partial.leverage.is_none();

        Self {
            volatility: partial.volatility.is_none(),
            market_trend: partial.market_trend.is_none(),
            position_wallet: if position_missing {
                partial.wallet().map(str::to_string)
            } else {
                None
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.volatility && !self.market_trend && self.position_wallet.is_none()
    }
}

/// Values returned by the providers, before merging.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedFeatures {
    pub volatility: Option<f64>,
    pub market_trend: Option<f64>,
    pub position: Option<PositionSnapshot>,
}

impl FetchedFeatures {
    /// Caller-supplied values win over fetched ones.
    pub fn merge_into(self, mut partial: PartialFeatures) -> PartialFeatures {
        let mut offer = |feature: Feature, value: Option<f64>| {
            if let (None, Some(v)) = (partial.get(feature), value) {
                partial.set(feature, v);
            }
        };

        offer(Feature::Volatility, self.volatility);
        offer(Feature::MarketTrend, self.market_trend);
        if let Some(position) = self.position {
            offer(Feature::CollateralRatio, Some(position.collateral_ratio));
            offer(Feature::Leverage, Some(position.leverage));
            offer(Feature::AssetPrice, Some(position.asset_price));
        }

        partial
    }
}

pub struct EnrichmentCoordinator {
    volatility: Arc<dyn VolatilityProvider>,
    trend: Arc<dyn TrendProvider>,
    position: Arc<dyn PositionProvider>,
    timeout: Duration,
}

impl EnrichmentCoordinator {
    pub fn new(
        volatility: Arc<dyn VolatilityProvider>,
        trend: Arc<dyn TrendProvider>,
        position: Arc<dyn PositionProvider>,
        timeout: Duration,
    ) -> Self {
        Self {
            volatility,
            trend,
            position,
            timeout,
        }
    }

    /// One source for all three capabilities.
    pub fn with_source<P>(source: Arc<P>, timeout: Duration) -> Self
    where
        P: VolatilityProvider + TrendProvider + PositionProvider + 'static,
    {
        Self::new(source.clone(), source.clone(), source, timeout)
    }

    /// Live CoinGecko/Aave providers when `live_data` is set, simulated otherwise.
    pub fn from_config(config: &Config) -> Self {
        let timeout = Duration::from_secs(config.provider_timeout_secs);

        if config.live_data {
            info!("Using live market data for asset {}", config.asset_id);
            let coingecko = Arc::new(CoinGeckoClient::new(&config.coingecko_url, &config.asset_id));
            let aave = Arc::new(AaveSubgraphClient::new(
                &config.aave_subgraph_url,
                CoinGeckoClient::new(&config.coingecko_url, &config.asset_id),
            ));
            Self::new(coingecko.clone(), coingecko, aave, timeout)
        } else {
            info!("Using simulated market data");
            Self::with_source(Arc::new(SimulatedMarketData::new()), timeout)
        }
    }

    /// Never fails; any field no provider could supply gets its default.
    pub async fn enrich(&self, partial: PartialFeatures) -> FeatureSet {
        let request = EnrichmentRequest::for_features(&partial);

        if request.is_empty() {
            debug!("No enrichment needed");
            return partial.complete_with_defaults();
        }

        let fetched = self.fetch(&request).await;
        let merged = fetched.merge_into(partial);

        for feature in merged.missing() {
            info!(
                "{:?} unavailable after enrichment, using default {}",
                feature,
                feature.default_value()
            );
        }

        merged.complete_with_defaults()
    }

    /// Issues the scheduled provider calls concurrently.
    pub async fn fetch(&self, request: &EnrichmentRequest) -> FetchedFeatures {
        let volatility: OptionFuture<_> = request
            .volatility
            .then(|| self.guarded("volatility", self.volatility.volatility()))
            .into();
        let trend: OptionFuture<_> = request
            .market_trend
            .then(|| self.guarded("market trend", self.trend.market_trend()))
            .into();
        let position: OptionFuture<_> = request
            .position_wallet
            .as_deref()
            .map(|wallet| self.guarded("position", self.position.position(wallet)))
            .into();

        let (volatility, market_trend, position) = tokio::join!(volatility, trend, position);

        FetchedFeatures {
            volatility: volatility.flatten(),
            market_trend: market_trend.flatten(),
            position: position.flatten(),
        }
    }

    /// Bounds a provider call by the timeout and turns any failure into `None`.
    async fn guarded<T, F>(&self, what: &str, call: F) -> Option<T>
    where
        F: Future<Output = Result<T>>,
    {
        let outcome = tokio::time::timeout(self.timeout, call)
            .await
            .unwrap_or_else(|_| Err(RiskSeerError::Timeout(self.timeout)));

        match outcome {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("{} provider unavailable: {}", what, e);
                None
            }
        }
    }
}
