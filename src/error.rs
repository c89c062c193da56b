use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RiskSeerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Provider unavailable: {0}")]
    Provider(String),

    #[error("Endpoint error: {0}")]
    Endpoint(String),

    #[error("Notification error: {0}")]
    Notification(String),
}

impl RiskSeerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn provider_error(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    pub fn endpoint_error(msg: impl Into<String>) -> Self {
        Self::Endpoint(msg.into())
    }

    pub fn notification_error(msg: impl Into<String>) -> Self {
        Self::Notification(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, RiskSeerError>;
