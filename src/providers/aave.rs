use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use super::{round_to, CoinGeckoClient, PositionProvider, PositionSnapshot};
use crate::error::{Result, RiskSeerError};

pub const DEFAULT_AAVE_SUBGRAPH_URL: &str =
    "https://api.thegraph.com/subgraphs/name/aave/protocol-v2";

const MIN_DENOMINATOR: f64 = 0.0001;

#[derive(Debug, Deserialize)]
struct GraphResponse {
    data: Option<GraphData>,
}

#[derive(Debug, Deserialize)]
struct GraphData {
    #[serde(default)]
    users: Vec<AaveUser>,
}

#[derive(Debug, Deserialize)]
struct AaveUser {
    #[serde(rename = "totalCollateralETH")]
    total_collateral_eth: String,
    #[serde(rename = "totalBorrowsETH")]
    total_borrows_eth: String,
}

/// Reads a wallet's Aave position from The Graph and prices it via CoinGecko.
#[derive(Debug, Clone)]
pub struct AaveSubgraphClient {
    client: Client,
    subgraph_url: String,
    prices: CoinGeckoClient,
}

impl AaveSubgraphClient {
    pub fn new(subgraph_url: impl Into<String>, prices: CoinGeckoClient) -> Self {
        Self {
            client: Client::new(),
            subgraph_url: subgraph_url.into(),
            prices,
        }
    }

    async fn fetch_user(&self, wallet: &str) -> Result<AaveUser> {
        let query = format!(
            "{{ users(where: {{id: \"{}\"}}) {{ totalCollateralETH totalBorrowsETH }} }}",
            wallet
        );
        debug!("Querying Aave subgraph for {}", wallet);

        let response = self
            .client
            .post(&self.subgraph_url)
            .json(&serde_json::json!({ "query": query }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RiskSeerError::provider_error(format!(
                "Aave subgraph returned {}",
                response.status()
            )));
        }

        let body: GraphResponse = response.json().await?;
        body.data
            .and_then(|data| data.users.into_iter().next())
            .ok_or_else(|| {
                RiskSeerError::provider_error(format!("no Aave position for {}", wallet))
            })
    }
}

#[async_trait]
impl PositionProvider for AaveSubgraphClient {
    async fn position(&self, wallet: &str) -> Result<PositionSnapshot> {
        let wallet = wallet.trim().to_lowercase();

        let (user, asset_price) = tokio::join!(self.fetch_user(&wallet), self.prices.spot_price());
        let user = user?;

        let collateral = parse_eth_amount(&user.total_collateral_eth)?;
        let borrows = parse_eth_amount(&user.total_borrows_eth)?;
        let (collateral_ratio, leverage) = position_ratios(collateral, borrows);

        info!(
            "Aave position for {}: collateral ratio {}, leverage {}",
            wallet, collateral_ratio, leverage
        );

        Ok(PositionSnapshot {
            collateral_ratio,
            leverage,
            asset_price: asset_price?,
        })
    }
}

fn parse_eth_amount(raw: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|e| RiskSeerError::provider_error(format!("bad ETH amount '{}': {}", raw, e)))
}

/// Collateral ratio and leverage from collateral and debt, both rounded to 2 places.
pub fn position_ratios(collateral: f64, borrows: f64) -> (f64, f64) {
    let collateral_ratio = collateral / borrows.max(MIN_DENOMINATOR);
    let leverage = 1.0 + borrows / collateral.max(MIN_DENOMINATOR);
    (round_to(collateral_ratio, 2), round_to(leverage, 2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn ratios_for_typical_borrow() {
        assert_eq!(position_ratios(10.0, 5.0), (2.0, 1.5));
    }

    #[test]
    fn ratios_guard_against_zero_debt() {
        let (ratio, leverage) = position_ratios(1.0, 0.0);
        assert_eq!(ratio, 10000.0);
        assert_eq!(leverage, 1.0);
    }

    #[tokio::test]
    async fn position_combines_subgraph_and_price() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/subgraph"))
            .and(body_string_contains("0xabcdef"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": { "users": [
                    { "totalCollateralETH": "12.0", "totalBorrowsETH": "4.0" }
                ] }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/simple/price"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ethereum": { "usd": 1850.0 }
            })))
            .mount(&server)
            .await;

        let prices = CoinGeckoClient::new(server.uri(), "ethereum");
        let client = AaveSubgraphClient::new(format!("{}/subgraph", server.uri()), prices);

        let position = client.position("  0xABCDEF ").await.unwrap();
        assert_eq!(position.collateral_ratio, 3.0);
        assert_eq!(position.leverage, 1.33);
        assert_eq!(position.asset_price, 1850.0);
    }

    #[tokio::test]
    async fn unknown_wallet_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "data": { "users": [] } })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ethereum": { "usd": 1850.0 }
            })))
            .mount(&server)
            .await;

        let prices = CoinGeckoClient::new(server.uri(), "ethereum");
        let client = AaveSubgraphClient::new(server.uri(), prices);

        let err = client.position("0x0").await.unwrap_err();
        assert!(matches!(err, RiskSeerError::Provider(_)));
    }
}
