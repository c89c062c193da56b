use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use tracing::{debug, info, warn};

use super::{EndpointDescriptor, EndpointShape, RemoteScore, ScoreSource, ScoringPayload, ScoringResult};
use crate::config::Config;
use crate::error::{Result, RiskSeerError};
use crate::evaluator::fallback_score;
use crate::features::FeatureSet;

pub const DEFAULT_ENDPOINT_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_CLOUD_MODEL: &str = "asi1-mini";

const FALLBACK_EXPLANATION: &str =
    "Fallback local model used due to scoring backend unavailability.";

#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub timeout: Duration,
    pub api_key: Option<String>,
    pub cloud_model: String,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_ENDPOINT_TIMEOUT,
            api_key: None,
            cloud_model: DEFAULT_CLOUD_MODEL.to_string(),
        }
    }
}

/// Tries each scoring endpoint in order and falls back to the local formula
/// when none answers with a 2xx.
pub struct ScoringGateway {
    client: Client,
    endpoints: Vec<EndpointDescriptor>,
    settings: GatewaySettings,
}

impl ScoringGateway {
    pub fn new(endpoints: Vec<EndpointDescriptor>, settings: GatewaySettings) -> Result<Self> {
        if endpoints.is_empty() {
            return Err(RiskSeerError::config_error(
                "scoring gateway needs at least one endpoint",
            ));
        }

        Ok(Self {
            client: Client::new(),
            endpoints,
            settings,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.scoring_endpoints.clone(),
            GatewaySettings {
                timeout: Duration::from_secs(config.endpoint_timeout_secs),
                api_key: config.api_key.clone(),
                cloud_model: config.cloud_model.clone(),
            },
        )
    }

    pub fn endpoints(&self) -> &[EndpointDescriptor] {
        &self.endpoints
    }

    /// Never fails: the worst case is a local fallback result carrying the
    /// last endpoint error.
    pub async fn score(&self, features: &FeatureSet) -> ScoringResult {
        let payload = ScoringPayload::from(features);
        let mut last_error: Option<String> = None;

        // first 2xx answer wins, later endpoints are not contacted
        for (index, endpoint) in self.endpoints.iter().enumerate() {
            info!("Trying scoring endpoint #{}: {}", index, endpoint);

            let attempt = tokio::time::timeout(
                self.settings.timeout,
                self.try_endpoint(endpoint, &payload),
            )
            .await
            .unwrap_or_else(|_| Err(RiskSeerError::Timeout(self.settings.timeout)));

            match attempt {
                Ok(remote) => {
                    info!(
                        "Endpoint #{} answered: probability {}, class {}",
                        index, remote.probability, remote.class_marker
                    );
                    return remote_result(remote, endpoint.shape, index, features.clone());
                }
                Err(e) => {
                    warn!("Scoring endpoint {} failed: {}", endpoint.url, e);
                    last_error = Some(e.to_string());
                }
            }
        }

        info!("All scoring endpoints failed, using local fallback model");
        let mut result =
            ScoringResult::new(fallback_score(features), ScoreSource::LocalFallback, features.clone());
        result.explanation = FALLBACK_EXPLANATION.to_string();
        result.error = last_error;
        result
    }

    async fn try_endpoint(
        &self,
        endpoint: &EndpointDescriptor,
        payload: &ScoringPayload,
    ) -> Result<RemoteScore> {
        let body = endpoint.request_body(payload, &self.settings.cloud_model)?;

        let response = self
            .client
            .post(&endpoint.url)
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RiskSeerError::endpoint_error(format!(
                "{} returned {}",
                endpoint.url, status
            )));
        }

        let text = response.text().await?;
        debug!("Endpoint {} raw response: {}", endpoint.url, text);
        endpoint.parse_response(&text)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(key) = &self.settings.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {}", key))
                .map_err(|e| RiskSeerError::config_error(format!("invalid API key: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }
}

fn remote_result(
    remote: RemoteScore,
    shape: EndpointShape,
    index: usize,
    features: FeatureSet,
) -> ScoringResult {
    let source = match shape {
        EndpointShape::Cloud => ScoreSource::RemoteCloud,
        EndpointShape::LocalMock => ScoreSource::RemoteLocalMock,
    };

    let mut result = ScoringResult::new(remote.probability, source, features);
    result.raw_endpoint_index = Some(index);
    result.remote_class = Some(remote.class_marker);
    if let Some(text) = remote.text {
        result.explanation = text;
    }
    if let Some(action) = remote.action {
        result.action = action;
    }
    result
}
