use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use riskseer::{
    config, PartialFeatures, RiskPipeline, ScoringGateway, ScoringResult, TelegramNotifier,
    WalletMonitor,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Score one position; missing features are fetched from providers
    Predict {
        #[command(flatten)]
        features: FeatureArgs,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Re-score a wallet periodically and alert on high risk
    Monitor {
        /// Wallet address to watch
        #[arg(long)]
        wallet: String,
    },
    /// List the configured scoring endpoints
    Endpoints,
}

#[derive(Args)]
struct FeatureArgs {
    /// Volatility as a fraction (0-1)
    #[arg(long)]
    volatility: Option<f64>,
    /// Collateral ratio, e.g. 1.2
    #[arg(long)]
    collateral_ratio: Option<f64>,
    /// Leverage factor, e.g. 2.5
    #[arg(long)]
    leverage: Option<f64>,
    /// Asset price in USD
    #[arg(long)]
    asset_price: Option<f64>,
    /// Market trend as a signed fraction, e.g. -0.1
    #[arg(long, allow_hyphen_values = true)]
    market_trend: Option<f64>,
    /// Lending protocol name
    #[arg(long)]
    protocol: Option<String>,
    /// Wallet address used to look up the position
    #[arg(long)]
    wallet: Option<String>,
}

impl From<FeatureArgs> for PartialFeatures {
    fn from(args: FeatureArgs) -> Self {
        Self {
            volatility: args.volatility,
            collateral_ratio: args.collateral_ratio,
            leverage: args.leverage,
            asset_price: args.asset_price,
            market_trend: args.market_trend,
            protocol: args.protocol,
            user_wallet: args.wallet,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging
    let level = log_level(cli.verbose, std::env::var("RUST_LOG_LEVEL").ok().as_deref());
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    info!("Starting RiskSeer - DeFi liquidation risk oracle");

    let config = config::load_config()
        .await
        .context("failed to load configuration")?;

    match cli.command {
        Some(Commands::Predict { features, json }) => {
            let pipeline = RiskPipeline::from_config(&config)?;
            let result = pipeline.predict(features.into()).await;
            print_result(&result, json)?;
        }
        Some(Commands::Monitor { wallet }) => {
            let monitor = WalletMonitor::new(
                RiskPipeline::from_config(&config)?,
                TelegramNotifier::new(
                    config.telegram_bot_token.clone(),
                    config.telegram_chat_id.clone(),
                ),
                wallet,
                config.alert_threshold,
                Duration::from_secs(config.monitor_interval_secs),
            );

            tokio::select! {
                _ = monitor.run() => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutting down wallet monitor");
                }
            }
        }
        Some(Commands::Endpoints) => {
            let gateway = ScoringGateway::from_config(&config)?;
            for (index, endpoint) in gateway.endpoints().iter().enumerate() {
                println!("#{} {:<5} {}", index, endpoint.shape, endpoint.url);
            }
        }
        None => {
            info!("No command specified. Use --help for available commands.");
        }
    }

    Ok(())
}

/// `--verbose` forces DEBUG; otherwise `RUST_LOG_LEVEL` if it names a level, else INFO.
fn log_level(verbose: bool, env_level: Option<&str>) -> Level {
    if verbose {
        return Level::DEBUG;
    }

    env_level
        .and_then(|raw| raw.trim().parse::<Level>().ok())
        .unwrap_or(Level::INFO)
}

fn print_result(result: &ScoringResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    println!("Risk probability: {:.2}%", result.probability);
    println!("Risk class:       {}", result.class);
    println!("Message:          {}", result.message);
    println!("Action:           {}", result.action);
    println!("Source:           {}", result.source);
    if !result.explanation.is_empty() {
        println!("Explanation:      {}", result.explanation);
    }
    if let Some(error) = &result.error {
        println!("Last error:       {}", error);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_from_flag_or_env() {
        assert_eq!(log_level(false, None), Level::INFO);
        assert_eq!(log_level(true, None), Level::DEBUG);
        assert_eq!(log_level(false, Some("debug")), Level::DEBUG);
        assert_eq!(log_level(false, Some("WARN")), Level::WARN);
        assert_eq!(log_level(false, Some("chatty")), Level::INFO);
        assert_eq!(log_level(true, Some("error")), Level::DEBUG);
    }
}
