use tracing::debug;

use crate::features::FeatureSet;

pub const MIN_PROBABILITY: f64 = 5.0;
pub const MAX_PROBABILITY: f64 = 95.0;

/// Remote scores treated as placeholder answers rather than real estimates.
///
/// These values come from flat responses observed from mock backends. They
/// are compared exactly; widening this set changes which remote answers are
/// discarded, so don't extend it to ranges.
pub const DEGENERATE_SENTINELS: [f64; 3] = [0.0, 31.0, 35.0];

/// Deterministic local risk score in [5, 95], rounded to 2 decimal places.
///
/// `volatility*40 + leverage*10 - collateral_ratio*5 - market_trend*20`
pub fn fallback_score(features: &FeatureSet) -> f64 {
    let raw = features.volatility * 40.0 + features.leverage * 10.0
        - features.collateral_ratio * 5.0
        - features.market_trend * 20.0;

    // NaN inputs would otherwise escape the clamp
    let bounded = if raw.is_nan() {
        MIN_PROBABILITY
    } else {
        raw.clamp(MIN_PROBABILITY, MAX_PROBABILITY)
    };
    let probability = (bounded * 100.0).round() / 100.0;

    debug!("Fallback score: raw {:.4} -> {}", raw, probability);
    probability
}

pub fn is_degenerate(probability: f64) -> bool {
    DEGENERATE_SENTINELS.contains(&probability)
}
