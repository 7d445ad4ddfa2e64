//! SURGE: momentum spot trading agent.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! verifies exchange credentials, and runs exactly one trading cycle:
//! select momentum candidates, allocate capital, buy, and place
//! protective sells. The process terminates when the cycle completes.

use anyhow::{Context, Result};
use secrecy::SecretString;
use std::time::Duration;
use tracing::{info, warn};

use surge::config::AppConfig;
use surge::engine::allocator::CapitalAllocator;
use surge::engine::executor::OrderExecutor;
use surge::engine::selector::CandidateSelector;
use surge::engine::session::TradingSession;
use surge::exchange::coinbase::CoinbaseClient;
use surge::exchange::SpotExchange;
use surge::types::TradeOutcome;

const BANNER: &str = r#"
  ____  _   _ ____   ____ _____
 / ___|| | | |  _ \ / ___| ____|
 \___ \| | | | |_) | |  _|  _|
  ___) | |_| |  _ <| |_| | |___
 |____/ \___/|_| \_\\____|_____|

  Spot momentum buyer with profit-target exits
  v0.1.0, one cycle per run
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Load configuration from TOML
    let cfg = AppConfig::load("config.toml")?;

    // Initialise structured logging
    init_logging();

    // Print startup banner
    println!("{BANNER}");
    info!(
        quote_currency = %cfg.trader.quote_currency,
        momentum_threshold_pct = %cfg.strategy.momentum_threshold_pct,
        max_balance_fraction = %cfg.strategy.max_balance_fraction,
        target_profit = %cfg.strategy.target_profit,
        "SURGE starting up"
    );

    // -- Exchange client ---------------------------------------------------

    let api_key = AppConfig::resolve_env(&cfg.exchange.api_key_env)?;
    let exchange = CoinbaseClient::new(
        cfg.exchange.base_url.clone(),
        SecretString::new(api_key),
        Duration::from_secs(cfg.exchange.timeout_secs),
    )?;

    // Verify credentials and list accounts for diagnostics.
    let accounts = exchange
        .list_accounts()
        .await
        .context("Failed to list accounts; check the API credentials in .env")?;
    info!(count = accounts.len(), "Available accounts");
    for account in &accounts {
        info!(currency = %account.currency, id = %account.id, "Account");
    }

    let quote_account_id = AppConfig::resolve_env(&cfg.exchange.quote_account_id_env)?;

    // -- One trading cycle -------------------------------------------------

    let session = TradingSession::new(
        CandidateSelector::new(cfg.selector_config()),
        CapitalAllocator::new(cfg.allocator_config()),
        OrderExecutor::new(cfg.executor_config()),
    );

    let report = session.run(&exchange, &quote_account_id).await?;

    for outcome in &report.outcomes {
        match outcome {
            TradeOutcome::BuyFailed { .. } | TradeOutcome::SellFailed { .. } => {
                warn!(outcome = %outcome, "Trade outcome")
            }
            _ => info!(outcome = %outcome, "Trade outcome"),
        }
    }

    info!(
        scanned = report.products_scanned,
        candidates = report.candidates_found,
        planned = report.orders_planned,
        buys = report.buys_placed(),
        sells = report.sells_placed(),
        skipped = report.sells_skipped(),
        failed = report.failures(),
        committed = %report.total_committed(),
        "Trading session completed"
    );

    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("surge=info"));

    let json_logging = std::env::var("SURGE_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
