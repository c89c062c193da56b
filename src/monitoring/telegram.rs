use reqwest::Client;
use tracing::{debug, error, info};

use crate::error::{Result, RiskSeerError};
use crate::scoring::ScoringResult;

pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";

pub struct TelegramNotifier {
    bot_token: Option<String>,
    chat_id: Option<String>,
    api_url: String,
    client: Client,
}

impl TelegramNotifier {
    pub fn new(bot_token: Option<String>, chat_id: Option<String>) -> Self {
        Self::with_api_url(bot_token, chat_id, TELEGRAM_API_URL)
    }

    pub fn with_api_url(
        bot_token: Option<String>,
        chat_id: Option<String>,
        api_url: impl Into<String>,
    ) -> Self {
        Self {
            bot_token,
            chat_id,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.bot_token.is_some() && self.chat_id.is_some()
    }

    /// Posts `message` with HTML parse mode. Does nothing when unconfigured.
    pub async fn send_notification(&self, message: &str) -> Result<()> {
        let (Some(bot_token), Some(chat_id)) = (&self.bot_token, &self.chat_id) else {
            debug!("Telegram not configured, alert not sent");
            return Ok(());
        };

        let response = self
            .client
            .post(format!("{}/bot{}/sendMessage", self.api_url, bot_token))
            .form(&[
                ("chat_id", chat_id.as_str()),
                ("text", message),
                ("parse_mode", "HTML"),
            ])
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            info!("Risk alert delivered to Telegram chat {}", chat_id);
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        error!("Telegram rejected risk alert ({}): {}", status, body);
        Err(RiskSeerError::notification_error(format!(
            "Telegram API returned {}: {}",
            status, body
        )))
    }

    pub async fn notify_risk_alert(&self, wallet: &str, result: &ScoringResult) -> Result<()> {
        self.send_notification(&format_risk_alert(wallet, result)).await
    }
}

/// Escapes text for Telegram's HTML parse mode.
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn format_risk_alert(wallet: &str, result: &ScoringResult) -> String {
    format!(
        "<b>🚨 RiskSeer Liquidation Alert</b>\n\n\
        Wallet: <code>{}</code>\n\
        Risk: <b>{:.2}%</b> ({})\n\
        {}\n\
        Collateral Ratio: <b>{}</b>\n\
        Leverage: <b>{}x</b>\n\
        Action: <b>{}</b>\n\
        Source: {}",
        escape_html(wallet),
        result.probability,
        result.class,
        escape_html(&result.message),
        result.features.collateral_ratio,
        result.features.leverage,
        escape_html(&result.action),
        result.source
    )
}
