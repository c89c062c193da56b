use async_trait::async_trait;
use tracing::debug;

use super::{PositionProvider, PositionSnapshot, TrendProvider, VolatilityProvider};
use crate::error::Result;

/// Fixed placeholder market data, used when live data is disabled.
#[derive(Debug, Clone)]
pub struct SimulatedMarketData {
    pub volatility: f64,
    pub market_trend: f64,
    pub position: PositionSnapshot,
}

impl SimulatedMarketData {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SimulatedMarketData {
    fn default() -> Self {
        Self {
            volatility: 0.59,
            market_trend: -0.15,
            position: PositionSnapshot {
                collateral_ratio: 1.2,
                leverage: 2.5,
                asset_price: 1600.0,
            },
        }
    }
}

#[async_trait]
impl VolatilityProvider for SimulatedMarketData {
    async fn volatility(&self) -> Result<f64> {
        debug!("Using simulated volatility {}", self.volatility);
        Ok(self.volatility)
    }
}

#[async_trait]
impl TrendProvider for SimulatedMarketData {
    async fn market_trend(&self) -> Result<f64> {
        debug!("Using simulated market trend {}", self.market_trend);
        Ok(self.market_trend)
    }
}

#[async_trait]
impl PositionProvider for SimulatedMarketData {
    async fn position(&self, wallet: &str) -> Result<PositionSnapshot> {
        debug!("Using simulated position for wallet {}", wallet);
        Ok(self.position)
    }
}
