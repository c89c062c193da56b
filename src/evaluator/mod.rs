pub mod classifier;
pub mod fallback;

pub use classifier::{classify, Classification, RiskClass, DEFAULT_ACTION};
pub use fallback::{fallback_score, is_degenerate, DEGENERATE_SENTINELS, MAX_PROBABILITY, MIN_PROBABILITY};
