use serde::{Deserialize, Serialize};

pub const DEFAULT_VOLATILITY: f64 = 0.5;
pub const DEFAULT_COLLATERAL_RATIO: f64 = 1.2;
pub const DEFAULT_LEVERAGE: f64 = 2.0;
pub const DEFAULT_ASSET_PRICE: f64 = 2000.0;
pub const DEFAULT_MARKET_TREND: f64 = 0.0;

/// One of the five numeric risk inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Volatility,
    CollateralRatio,
    Leverage,
    AssetPrice,
    MarketTrend,
}

impl Feature {
    pub const ALL: [Feature; 5] = [
        Feature::Volatility,
        Feature::CollateralRatio,
        Feature::Leverage,
        Feature::AssetPrice,
        Feature::MarketTrend,
    ];

    pub fn default_value(self) -> f64 {
        match self {
            Feature::Volatility => DEFAULT_VOLATILITY,
            Feature::CollateralRatio => DEFAULT_COLLATERAL_RATIO,
            Feature::Leverage => DEFAULT_LEVERAGE,
            Feature::AssetPrice => DEFAULT_ASSET_PRICE,
            Feature::MarketTrend => DEFAULT_MARKET_TREND,
        }
    }
}

/// Caller-supplied features. Any numeric field may be absent and will be
/// filled by enrichment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialFeatures {
    pub volatility: Option<f64>,
    pub collateral_ratio: Option<f64>,
    pub leverage: Option<f64>,
    pub asset_price: Option<f64>,
    pub market_trend: Option<f64>,
    pub protocol: Option<String>,
    pub user_wallet: Option<String>,
}

impl PartialFeatures {
    pub fn get(&self, feature: Feature) -> Option<f64> {
        match feature {
            Feature::Volatility => self.volatility,
            Feature::CollateralRatio => self.collateral_ratio,
            Feature::Leverage => self.leverage,
            Feature::AssetPrice => self.asset_price,
            Feature::MarketTrend => self.market_trend,
        }
    }

    pub fn set(&mut self, feature: Feature, value: f64) {
        let slot = match feature {
            Feature::Volatility => &mut self.volatility,
            Feature::CollateralRatio => &mut self.collateral_ratio,
            Feature::Leverage => &mut self.leverage,
            Feature::AssetPrice => &mut self.asset_price,
            Feature::MarketTrend => &mut self.market_trend,
        };
        *slot = Some(value);
    }

    pub fn missing(&self) -> Vec<Feature> {
        Feature::ALL
            .into_iter()
            .filter(|f| self.get(*f).is_none())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }

    /// Wallet id if present and not blank.
    pub fn wallet(&self) -> Option<&str> {
        self.user_wallet
            .as_deref()
            .map(str::trim)
            .filter(|w| !w.is_empty())
    }

    /// Fills every absent field with its documented default.
    pub fn complete_with_defaults(self) -> FeatureSet {
        let value = |f: Feature| self.get(f).unwrap_or_else(|| f.default_value());
        FeatureSet {
            volatility: value(Feature::Volatility),
            collateral_ratio: value(Feature::CollateralRatio),
            leverage: value(Feature::Leverage),
            asset_price: value(Feature::AssetPrice),
            market_trend: value(Feature::MarketTrend),
            protocol: self.protocol,
            user_wallet: self.user_wallet,
        }
    }
}

/// A complete feature record, ready for scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub volatility: f64,
    pub collateral_ratio: f64,
    pub leverage: f64,
    pub asset_price: f64,
    pub market_trend: f64,
    pub protocol: Option<String>,
    pub user_wallet: Option<String>,
}

impl Default for FeatureSet {
    fn default() -> Self {
        PartialFeatures::default().complete_with_defaults()
    }
}

impl From<FeatureSet> for PartialFeatures {
    fn from(features: FeatureSet) -> Self {
        Self {
            volatility: Some(features.volatility),
            collateral_ratio: Some(features.collateral_ratio),
            leverage: Some(features.leverage),
            asset_price: Some(features.asset_price),
            market_trend: Some(features.market_trend),
            protocol: features.protocol,
            user_wallet: features.user_wallet,
        }
    }
}
