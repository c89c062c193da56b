use std::time::Duration;

use tracing::{error, info, warn};

use super::TelegramNotifier;
use crate::features::PartialFeatures;
use crate::pipeline::RiskPipeline;
use crate::scoring::ScoringResult;

const MONITORED_PROTOCOL: &str = "Aave";

/// Periodically re-scores one wallet and raises alerts above a threshold.
pub struct WalletMonitor {
    pipeline: RiskPipeline,
    notifier: TelegramNotifier,
    wallet: String,
    alert_threshold: f64,
    interval: Duration,
}

impl WalletMonitor {
    pub fn new(
        pipeline: RiskPipeline,
        notifier: TelegramNotifier,
        wallet: impl Into<String>,
        alert_threshold: f64,
        interval: Duration,
    ) -> Self {
        Self {
            pipeline,
            notifier,
            wallet: wallet.into(),
            alert_threshold,
            interval,
        }
    }

    pub fn should_alert(&self, result: &ScoringResult) -> bool {
        result.probability >= self.alert_threshold
    }

    /// Scores the wallet once, alerting if needed. Returns the result and
    /// whether an alert was raised.
    pub async fn check_once(&self) -> (ScoringResult, bool) {
        let partial = PartialFeatures {
            protocol: Some(MONITORED_PROTOCOL.to_string()),
            user_wallet: Some(self.wallet.clone()),
            ..Default::default()
        };

        let result = self.pipeline.predict(partial).await;
        info!(
            "Wallet {} risk {:.2}% ({}) via {}",
            self.wallet, result.probability, result.class, result.source
        );

        if !self.should_alert(&result) {
            return (result, false);
        }

        warn!(
            "ALERT: wallet {} risk {:.2}% >= {}",
            self.wallet, result.probability, self.alert_threshold
        );
        if let Err(e) = self.notifier.notify_risk_alert(&self.wallet, &result).await {
            error!("Failed to send risk alert: {}", e);
        }

        (result, true)
    }

    /// Runs until the surrounding task is cancelled.
    pub async fn run(&self) {
        info!(
            "Monitoring wallet {} every {}s (alert threshold {})",
            self.wallet,
            self.interval.as_secs(),
            self.alert_threshold
        );

        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            self.check_once().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::EnrichmentCoordinator;
    use crate::providers::{PositionSnapshot, SimulatedMarketData};
    use crate::scoring::{EndpointDescriptor, GatewaySettings, ScoreSource, ScoringGateway};
    use std::sync::Arc;

    fn monitor(data: SimulatedMarketData, threshold: f64) -> WalletMonitor {
        let enrichment = EnrichmentCoordinator::with_source(Arc::new(data), Duration::from_secs(1));
        let gateway = ScoringGateway::new(
            vec![EndpointDescriptor::local_mock("http://127.0.0.1:9")],
            GatewaySettings {
                timeout: Duration::from_secs(1),
                ..Default::default()
            },
        )
        .unwrap();

        WalletMonitor::new(
            RiskPipeline::new(enrichment, gateway),
            TelegramNotifier::new(None, None),
            "0xwatched",
            threshold,
            Duration::from_secs(30),
        )
    }

    #[tokio::test]
    async fn risky_wallet_raises_alert() {
        let data = SimulatedMarketData {
            volatility: 0.9,
            market_trend: -0.3,
            position: PositionSnapshot {
                collateral_ratio: 1.05,
                leverage: 5.0,
                asset_price: 1500.0,
            },
        };

        // 0.9*40 + 5*10 - 1.05*5 + 0.3*20 = 86.75
        let (result, alerted) = monitor(data, 70.0).check_once().await;
        assert_eq!(result.source, ScoreSource::LocalFallback);
        assert_eq!(result.probability, 86.75);
        assert_eq!(result.features.user_wallet.as_deref(), Some("0xwatched"));
        assert!(alerted);
    }

    #[tokio::test]
    async fn healthy_wallet_stays_quiet() {
        // simulated defaults: 0.59*40 + 2.5*10 - 1.2*5 + 0.15*20 = 45.6
        let (result, alerted) = monitor(SimulatedMarketData::new(), 70.0).check_once().await;
        assert_eq!(result.probability, 45.6);
        assert!(!alerted);
    }
}
