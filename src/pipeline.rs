use tracing::{info, warn};

use crate::config::Config;
use crate::enrichment::EnrichmentCoordinator;
use crate::error::Result;
use crate::evaluator::{fallback_score, is_degenerate};
use crate::features::PartialFeatures;
use crate::scoring::{ScoringGateway, ScoringResult};

/// Enrichment, remote scoring and local postprocessing for one position.
///
/// Holds no per-request state; a single pipeline can serve concurrent
/// predictions.
pub struct RiskPipeline {
    enrichment: EnrichmentCoordinator,
    gateway: ScoringGateway,
}

impl RiskPipeline {
    pub fn new(enrichment: EnrichmentCoordinator, gateway: ScoringGateway) -> Self {
        Self {
            enrichment,
            gateway,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            EnrichmentCoordinator::from_config(config),
            ScoringGateway::from_config(config)?,
        ))
    }

    /// Always produces a bounded, classified result.
    pub async fn predict(&self, partial: PartialFeatures) -> ScoringResult {
        let features = self.enrichment.enrich(partial).await;
        info!(
            "Scoring features: volatility {}, collateral ratio {}, leverage {}, price {}, trend {}",
            features.volatility,
            features.collateral_ratio,
            features.leverage,
            features.asset_price,
            features.market_trend
        );

        let result = self.gateway.score(&features).await;
        postprocess(result)
    }
}

/// Replaces placeholder remote scores with the local formula and re-derives
/// class and message from the final probability.
pub fn postprocess(mut result: ScoringResult) -> ScoringResult {
    if is_degenerate(result.probability) {
        let rescued = fallback_score(&result.features);
        warn!(
            "Remote score {} from {} looks like a placeholder, using local formula: {}",
            result.probability, result.source, rescued
        );
        result.probability = rescued;
    }

    result.reclassify();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::RiskClass;
    use crate::features::FeatureSet;
    use crate::scoring::ScoreSource;

    fn remote(probability: f64) -> ScoringResult {
        let features = FeatureSet {
            volatility: 0.8,
            collateral_ratio: 1.1,
            leverage: 3.0,
            market_trend: -0.1,
            ..FeatureSet::default()
        };
        ScoringResult::new(probability, ScoreSource::RemoteLocalMock, features)
    }

    #[test]
    fn sentinel_scores_are_recomputed() {
        // 0.8*40 + 3*10 - 1.1*5 + 0.1*20 = 32 + 30 - 5.5 + 2
        for sentinel in [0.0, 31.0, 35.0] {
            let result = postprocess(remote(sentinel));
            assert_eq!(result.probability, 58.5);
            assert_eq!(result.class, RiskClass::Medium);
            assert_eq!(result.source, ScoreSource::RemoteLocalMock);
        }
    }

    #[test]
    fn genuine_scores_pass_through() {
        let result = postprocess(remote(35.5));
        assert_eq!(result.probability, 35.5);
        assert_eq!(result.class, RiskClass::Low);
    }

    #[test]
    fn class_follows_final_probability() {
        let mut result = remote(82.0);
        result.class = RiskClass::Low;
        result.message = "stale".to_string();

        let result = postprocess(result);
        assert_eq!(result.class, RiskClass::High);
        assert_eq!(result.message, "High liquidation risk detected!");
    }
}
