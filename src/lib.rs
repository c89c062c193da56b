//! RiskSeer - liquidation risk oracle for DeFi positions.
//!
//! Scores a position from five features (volatility, collateral ratio,
//! leverage, asset price, market trend):
//! - missing features are fetched concurrently from data providers
//! - remote scoring endpoints are tried in order, each with its own wire shape
//! - a deterministic local formula covers unavailable or placeholder answers
//!
//! `RiskPipeline::predict` never fails; every path ends in a bounded,
//! classified `ScoringResult`.

pub mod config;
pub mod enrichment;
pub mod error;
pub mod evaluator;
pub mod features;
pub mod monitoring;
pub mod pipeline;
pub mod providers;
pub mod scoring;

pub use config::{load_config, Config};
pub use enrichment::EnrichmentCoordinator;
pub use error::{Result, RiskSeerError};
pub use evaluator::{classify, fallback_score, RiskClass};
pub use features::{Feature, FeatureSet, PartialFeatures};
pub use monitoring::{TelegramNotifier, WalletMonitor};
pub use pipeline::RiskPipeline;
pub use scoring::{EndpointDescriptor, EndpointShape, ScoreSource, ScoringGateway, ScoringResult};
