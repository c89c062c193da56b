use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, RiskSeerError};
use crate::features::FeatureSet;

const CLOUD_HOSTS: [&str; 1] = ["asi1.ai"];
const UNKNOWN_CLASS: &str = "Unknown";

const SYSTEM_PROMPT: &str = "You are a DeFi risk analysis model. \
    Respond concisely with risk probability and class (🟢/🟡/🔴).";

/// Wire format spoken by a scoring endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointShape {
    /// Chat-completion API answering in free text.
    Cloud,
    /// Flat JSON model taking the raw feature record.
    LocalMock,
}

impl EndpointShape {
    /// Cloud for known chat-completion hosts, LocalMock otherwise.
    pub fn detect(url: &str) -> Self {
        let host = url
            .split("://")
            .nth(1)
            .unwrap_or(url)
            .split(['/', ':', '?'])
            .next()
            .unwrap_or_default()
            .to_lowercase();

        if CLOUD_HOSTS
            .iter()
            .any(|cloud| host == *cloud || host.ends_with(&format!(".{}", cloud)))
        {
            EndpointShape::Cloud
        } else {
            EndpointShape::LocalMock
        }
    }
}

impl fmt::Display for EndpointShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointShape::Cloud => f.pad("cloud"),
            EndpointShape::LocalMock => f.pad("mock"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    pub url: String,
    pub shape: EndpointShape,
}

impl EndpointDescriptor {
    pub fn new(url: impl Into<String>, shape: EndpointShape) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            shape,
        }
    }

    pub fn cloud(url: impl Into<String>) -> Self {
        Self::new(url, EndpointShape::Cloud)
    }

    pub fn local_mock(url: impl Into<String>) -> Self {
        Self::new(url, EndpointShape::LocalMock)
    }

    /// Serializes the scoring request for this endpoint's shape.
    pub fn request_body(&self, payload: &ScoringPayload, model: &str) -> Result<Value> {
        match self.shape {
            EndpointShape::Cloud => {
                let metrics = serde_json::to_string(payload)?;
                Ok(serde_json::json!({
                    "model": model,
                    "messages": [
                        { "role": "system", "content": SYSTEM_PROMPT },
                        {
                            "role": "user",
                            "content": format!(
                                "Given these metrics, estimate the DeFi portfolio risk:\n{}",
                                metrics
                            ),
                        },
                    ],
                    "temperature": 0.4,
                    "max_tokens": 150,
                }))
            }
            EndpointShape::LocalMock => Ok(serde_json::to_value(payload)?),
        }
    }

    /// Parses a 2xx response body for this endpoint's shape.
    pub fn parse_response(&self, body: &str) -> Result<RemoteScore> {
        match self.shape {
            EndpointShape::Cloud => parse_cloud_response(body),
            EndpointShape::LocalMock => parse_mock_response(body),
        }
    }
}

/// Accepts `url`, `cloud=url` or `mock=url`.
impl FromStr for EndpointDescriptor {
    type Err = RiskSeerError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (shape, url) = match s.split_once('=') {
            Some(("cloud", url)) => (Some(EndpointShape::Cloud), url),
            Some(("mock", url)) => (Some(EndpointShape::LocalMock), url),
            _ => (None, s),
        };

        let url = url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(RiskSeerError::config_error(format!(
                "invalid scoring endpoint '{}'",
                s
            )));
        }

        let shape = shape.unwrap_or_else(|| EndpointShape::detect(url));
        Ok(Self::new(url, shape))
    }
}

impl fmt::Display for EndpointDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.shape, self.url)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoringInputs {
    pub volatility: f64,
    pub collateral_ratio: f64,
    pub leverage: f64,
    pub asset_price: f64,
    pub market_trend: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoringContext {
    pub protocol: Option<String>,
    pub user_wallet: Option<String>,
}

/// Feature record as sent to scoring backends.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoringPayload {
    pub inputs: ScoringInputs,
    pub context: ScoringContext,
}

impl From<&FeatureSet> for ScoringPayload {
    fn from(features: &FeatureSet) -> Self {
        Self {
            inputs: ScoringInputs {
                volatility: features.volatility,
                collateral_ratio: features.collateral_ratio,
                leverage: features.leverage,
                asset_price: features.asset_price,
                market_trend: features.market_trend,
            },
            context: ScoringContext {
                protocol: features.protocol.clone(),
                user_wallet: features.user_wallet.clone(),
            },
        }
    }
}

/// What a remote backend said, before any postprocessing.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteScore {
    pub probability: f64,
    pub class_marker: String,
    pub text: Option<String>,
    pub action: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

fn probability_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"([0-9]+(?:\.[0-9]+)?)").expect("static regex"))
}

fn class_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(🟢|🟡|🔴)\s*\w*\s*Risk").expect("static regex"))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// First numeric token in the reply, or a random value in [20, 80] if none.
pub fn extract_probability(text: &str) -> f64 {
    let parsed = probability_pattern()
        .find(text)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|p| p.is_finite());

    let probability = parsed.unwrap_or_else(|| rand::thread_rng().gen_range(20.0..=80.0));
    round2(probability)
}

/// Color-coded class marker such as "🟡 Medium Risk", or "Unknown".
pub fn extract_class_marker(text: &str) -> String {
    class_pattern()
        .find(text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| UNKNOWN_CLASS.to_string())
}

fn parse_cloud_response(body: &str) -> Result<RemoteScore> {
    let completion: ChatCompletion = serde_json::from_str(body)?;
    let text = completion
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or_else(|| RiskSeerError::endpoint_error("chat completion has no choices"))?;

    Ok(RemoteScore {
        probability: extract_probability(&text),
        class_marker: extract_class_marker(&text),
        text: Some(text.trim().to_string()),
        action: None,
    })
}

fn numeric(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    number.filter(|p: &f64| p.is_finite())
}

fn text_field(body: &Value, key: &str) -> Option<String> {
    body.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_mock_response(body: &str) -> Result<RemoteScore> {
    let body: Value = serde_json::from_str(body)?;
    if !body.is_object() {
        return Err(RiskSeerError::endpoint_error("mock response is not a JSON object"));
    }

    let probability = body
        .get("risk_probability")
        .or_else(|| body.get("probability"))
        .and_then(numeric)
        .unwrap_or(0.0);

    let class_marker = text_field(&body, "risk_class")
        .or_else(|| text_field(&body, "class"))
        .unwrap_or_else(|| UNKNOWN_CLASS.to_string());

    Ok(RemoteScore {
        probability,
        class_marker,
        text: text_field(&body, "message"),
        action: text_field(&body, "action"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_cloud_host() {
        assert_eq!(
            EndpointShape::detect("https://api.asi1.ai/v1/chat/completions"),
            EndpointShape::Cloud
        );
        assert_eq!(EndpointShape::detect("https://asi1.ai"), EndpointShape::Cloud);
        assert_eq!(
            EndpointShape::detect("http://127.0.0.1:8001/analyze"),
            EndpointShape::LocalMock
        );
        assert_eq!(
            EndpointShape::detect("https://notasi1.ai.example.com"),
            EndpointShape::LocalMock
        );
    }

    #[test]
    fn parses_prefixed_descriptors() {
        let d: EndpointDescriptor = "cloud=http://localhost:9000/".parse().unwrap();
        assert_eq!(d, EndpointDescriptor::cloud("http://localhost:9000"));

        let d: EndpointDescriptor = "https://api.asi1.ai/v1/chat".parse().unwrap();
        assert_eq!(d.shape, EndpointShape::Cloud);

        assert!("ftp://nope".parse::<EndpointDescriptor>().is_err());
    }

    #[test]
    fn local_mock_body_is_raw_payload() {
        let payload = ScoringPayload::from(&FeatureSet::default());
        let body = EndpointDescriptor::local_mock("http://x")
            .request_body(&payload, "unused")
            .unwrap();
        assert_eq!(body["inputs"]["leverage"], 2.0);
        assert_eq!(body["context"]["protocol"], Value::Null);
    }

    #[test]
    fn cloud_body_wraps_payload_in_prompt() {
        let payload = ScoringPayload::from(&FeatureSet::default());
        let body = EndpointDescriptor::cloud("http://x")
            .request_body(&payload, "asi1-mini")
            .unwrap();
        assert_eq!(body["model"], "asi1-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        let prompt = body["messages"][1]["content"].as_str().unwrap();
        assert!(prompt.contains("\"collateral_ratio\":1.2"));
    }

    #[test]
    fn cloud_takes_first_number_literally() {
        let body = serde_json::json!({
            "choices": [{ "message": { "content":
                "ETH at 2000 USD. Risk probability: 42.5 - 🟡 Medium Risk" } }]
        })
        .to_string();

        let score = EndpointDescriptor::cloud("http://x").parse_response(&body).unwrap();
        assert_eq!(score.probability, 2000.0);
        assert_eq!(score.class_marker, "🟡 Medium Risk");
    }

    #[test]
    fn cloud_without_number_falls_in_random_band() {
        for _ in 0..50 {
            let p = extract_probability("no figures here");
            assert!((20.0..=80.0).contains(&p));
        }
        assert_eq!(extract_class_marker("no marker"), "Unknown");
    }

    #[test]
    fn cloud_without_choices_is_error() {
        let body = serde_json::json!({ "choices": [] }).to_string();
        assert!(EndpointDescriptor::cloud("http://x").parse_response(&body).is_err());
    }

    #[test]
    fn mock_reads_fields_with_defaults() {
        let d = EndpointDescriptor::local_mock("http://x");

        let score = d
            .parse_response(r#"{"risk_probability": 61.3, "risk_class": "🟡 Medium Risk", "message": "ok"}"#)
            .unwrap();
        assert_eq!(score.probability, 61.3);
        assert_eq!(score.class_marker, "🟡 Medium Risk");
        assert_eq!(score.text.as_deref(), Some("ok"));

        let score = d.parse_response(r#"{"probability": "12.5", "class": "Low"}"#).unwrap();
        assert_eq!(score.probability, 12.5);
        assert_eq!(score.class_marker, "Low");

        let score = d.parse_response("{}").unwrap();
        assert_eq!(score.probability, 0.0);
        assert_eq!(score.class_marker, "Unknown");
        assert_eq!(score.action, None);
    }

    #[test]
    fn mock_non_finite_probability_reads_as_zero() {
        let d = EndpointDescriptor::local_mock("http://x");
        for raw in ["NaN", "inf", "-infinity"] {
            let body = serde_json::json!({ "risk_probability": raw }).to_string();
            assert_eq!(d.parse_response(&body).unwrap().probability, 0.0, "{}", raw);
        }
    }

    #[test]
    fn cloud_overflowing_number_falls_in_random_band() {
        let huge = "9".repeat(400);
        let p = extract_probability(&format!("Risk {}% 🔴 High Risk", huge));
        assert!((20.0..=80.0).contains(&p));
    }

    #[test]
    fn mock_rejects_non_json() {
        let d = EndpointDescriptor::local_mock("http://x");
        assert!(d.parse_response("<html>bad gateway</html>").is_err());
        assert!(d.parse_response("[1, 2]").is_err());
    }
}
