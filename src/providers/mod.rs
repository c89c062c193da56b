//! Data providers used to enrich missing features.
//!
//! Each capability is a separate trait so a deployment can mix sources,
//! e.g. live CoinGecko volatility with a simulated position feed.

pub mod aave;
pub mod coingecko;
pub mod simulated;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use aave::AaveSubgraphClient;
pub use coingecko::CoinGeckoClient;
pub use simulated::SimulatedMarketData;

/// Lending position figures for one wallet, supplied in a single round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub collateral_ratio: f64,
    pub leverage: f64,
    pub asset_price: f64,
}

#[async_trait]
pub trait VolatilityProvider: Send + Sync {
    /// Volatility as a fraction in [0, 1].
    async fn volatility(&self) -> Result<f64>;
}

#[async_trait]
pub trait TrendProvider: Send + Sync {
    /// Signed market trend as a fraction, e.g. -0.1 for -10%.
    async fn market_trend(&self) -> Result<f64>;
}

#[async_trait]
pub trait PositionProvider: Send + Sync {
    async fn position(&self, wallet: &str) -> Result<PositionSnapshot>;
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
