//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (API key, account id) are referenced by env-var name in the
//! config and resolved at runtime via `std::env::var`.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs;
use std::time::Duration;

use crate::engine::allocator::AllocatorConfig;
use crate::engine::executor::ExecutorConfig;
use crate::engine::selector::SelectorConfig;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub trader: TraderConfig,
    pub exchange: ExchangeConfig,
    pub strategy: StrategyConfig,
    pub execution: ExecutionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TraderConfig {
    /// Currency the cap is denominated in; products must settle in it.
    pub quote_currency: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExchangeConfig {
    pub base_url: String,
    pub api_key_env: String,
    pub quote_account_id_env: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StrategyConfig {
    /// Minimum 24h price change (percent) for candidacy.
    pub momentum_threshold_pct: Decimal,
    /// Fraction of the available quote balance one cycle may commit.
    pub max_balance_fraction: Decimal,
    /// Profit target for the protective limit sell (0.5 = +50%).
    pub target_profit: Decimal,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExecutionConfig {
    pub settlement_delay_secs: u64,
    pub min_viable_spend: Decimal,
    pub quote_precision: u32,
    pub price_precision: u32,
    pub base_precision: u32,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }

    // -- Component config projections -------------------------------------

    pub fn selector_config(&self) -> SelectorConfig {
        SelectorConfig {
            momentum_threshold_pct: self.strategy.momentum_threshold_pct,
            quote_currency: self.trader.quote_currency.clone(),
        }
    }

    pub fn allocator_config(&self) -> AllocatorConfig {
        AllocatorConfig {
            max_balance_fraction: self.strategy.max_balance_fraction,
            min_viable_spend: self.execution.min_viable_spend,
            quote_precision: self.execution.quote_precision,
        }
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            target_profit: self.strategy.target_profit,
            settlement_delay: Duration::from_secs(self.execution.settlement_delay_secs),
            price_precision: self.execution.price_precision,
            base_precision: self.execution.base_precision,
        }
    }
}
