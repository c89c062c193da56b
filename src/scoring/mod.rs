pub mod endpoint;
pub mod gateway;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::evaluator::{classify, RiskClass, DEFAULT_ACTION};
use crate::features::FeatureSet;

pub use endpoint::{EndpointDescriptor, EndpointShape, RemoteScore, ScoringPayload};
pub use gateway::{GatewaySettings, ScoringGateway};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    RemoteCloud,
    RemoteLocalMock,
    LocalFallback,
}

impl fmt::Display for ScoreSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ScoreSource::RemoteCloud => "cloud",
            ScoreSource::RemoteLocalMock => "local-mock",
            ScoreSource::LocalFallback => "local-fallback",
        };
        f.write_str(label)
    }
}

/// Final answer for one prediction request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringResult {
    /// Risk probability in percent.
    pub probability: f64,
    pub class: RiskClass,
    pub message: String,
    pub action: String,
    pub explanation: String,
    pub source: ScoreSource,
    /// Index into the configured endpoint list that produced the score.
    pub raw_endpoint_index: Option<usize>,
    /// Class marker as reported by the remote backend, if any.
    pub remote_class: Option<String>,
    /// Last endpoint error seen before falling back.
    pub error: Option<String>,
    pub features: FeatureSet,
    pub evaluated_at: DateTime<Utc>,
}

impl ScoringResult {
    pub fn new(probability: f64, source: ScoreSource, features: FeatureSet) -> Self {
        let classification = classify(probability);
        Self {
            probability,
            class: classification.class,
            message: classification.message.to_string(),
            action: DEFAULT_ACTION.to_string(),
            explanation: String::new(),
            source,
            raw_endpoint_index: None,
            remote_class: None,
            error: None,
            features,
            evaluated_at: Utc::now(),
        }
    }

    /// Re-derives class and message from the current probability.
    pub fn reclassify(&mut self) {
        let classification = classify(self.probability);
        self.class = classification.class;
        self.message = classification.message.to_string();
    }

    pub fn is_fallback(&self) -> bool {
        self.source == ScoreSource::LocalFallback
    }
}
