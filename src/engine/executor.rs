//! Order executor.
//!
//! Walks the allocation plan sequentially: market buy, settlement wait,
//! then a protective GTC limit sell at the profit target. Transport
//! errors and exchange rejections are absorbed into that asset's
//! `TradeOutcome` so one failure never aborts the batch. This is the
//! central resilience contract of the cycle.

use anyhow::Result;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};
use uuid::Uuid;

use crate::exchange::SpotExchange;
use crate::types::{round_to, AllocationPlan, PlannedBuy, Product, TradeOutcome};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Executor configuration.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Profit target for the protective sell (0.5 = +50%).
    pub target_profit: Decimal,
    /// Wait between the buy and sizing the sell, so the fill can post
    /// to the base-currency balance.
    pub settlement_delay: Duration,
    /// Limit price precision (decimal places).
    pub price_precision: u32,
    /// Base size precision (decimal places).
    pub base_precision: u32,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            target_profit: dec!(0.5),
            settlement_delay: Duration::from_secs(5),
            price_precision: 6,
            base_precision: 8,
        }
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// How the sell phase ended for an asset whose buy filled.
enum SellPlacement {
    Placed {
        order_id: String,
        limit_price: Decimal,
        base_size: Decimal,
    },
    Skipped {
        available: Decimal,
        min_base_size: Decimal,
    },
}

pub struct OrderExecutor {
    config: ExecutorConfig,
}

impl OrderExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Execute every plan entry in order, strictly sequentially.
    pub async fn execute_plan(
        &self,
        exchange: &dyn SpotExchange,
        plan: &AllocationPlan,
    ) -> Vec<TradeOutcome> {
        let mut outcomes = Vec::with_capacity(plan.len());

        if plan.is_empty() {
            return outcomes;
        }

        info!(
            entries = plan.len(),
            spend_per_asset = %plan.spend_per_asset(),
            exchange = exchange.name(),
            "Executing allocation plan"
        );

        for entry in &plan.entries {
            let outcome = self.execute_entry(exchange, entry).await;
            match &outcome {
                TradeOutcome::BuyFailed { .. } | TradeOutcome::SellFailed { .. } => {
                    warn!(outcome = %outcome, "Asset sequence failed")
                }
                _ => info!(outcome = %outcome, "Asset sequence done"),
            }
            outcomes.push(outcome);
        }

        outcomes
    }

    /// Run the buy-then-sell sequence for one asset. Infallible by
    /// construction: every error path maps to a `TradeOutcome`.
    async fn execute_entry(
        &self,
        exchange: &dyn SpotExchange,
        entry: &PlannedBuy,
    ) -> TradeOutcome {
        let product_id = entry.product.id.clone();

        // -- Buy phase ----------------------------------------------------
        let buy_token = Uuid::new_v4().to_string();
        info!(product_id = %product_id, spend = %entry.quote_spend, "Submitting market buy");

        let buy = match exchange
            .market_buy(&buy_token, &product_id, entry.quote_spend)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                return TradeOutcome::BuyFailed {
                    product_id,
                    reason: e.to_string(),
                }
            }
        };

        if !buy.success {
            return TradeOutcome::BuyFailed {
                product_id,
                reason: buy
                    .failure_reason
                    .unwrap_or_else(|| "rejected by exchange".to_string()),
            };
        }

        let buy_order_id = buy.order_id.unwrap_or_else(|| "unknown".to_string());
        info!(product_id = %product_id, order_id = %buy_order_id, "Buy order executed");

        // -- Settlement wait ----------------------------------------------
        // The base balance only reflects the fill after settlement;
        // sizing the sell before that would see a stale balance.
        sleep(self.config.settlement_delay).await;

        // -- Sell phase ---------------------------------------------------
        match self.place_protective_sell(exchange, &entry.product).await {
            Ok(SellPlacement::Placed {
                order_id,
                limit_price,
                base_size,
            }) => TradeOutcome::Completed {
                product_id,
                buy_order_id,
                sell_order_id: order_id,
                limit_price,
                base_size,
            },
            Ok(SellPlacement::Skipped {
                available,
                min_base_size,
            }) => TradeOutcome::SellSkipped {
                product_id,
                buy_order_id,
                available,
                min_base_size,
            },
            Err(e) => TradeOutcome::SellFailed {
                product_id,
                buy_order_id,
                reason: e.to_string(),
            },
        }
    }

    /// Size and submit the protective sell for a filled buy.
    async fn place_protective_sell(
        &self,
        exchange: &dyn SpotExchange,
        product: &Product,
    ) -> Result<SellPlacement> {
        // Fresh product snapshot: the listing's min size may be stale.
        let info = exchange.get_product(&product.id).await?;
        let wallet = exchange.get_account(product.base_currency()).await?;
        let ticker = exchange.get_ticker(&product.id).await?;

        let limit_price = round_to(
            ticker.price * (Decimal::ONE + self.config.target_profit),
            self.config.price_precision,
        );

        // Partial fills or rounding can leave an unsellable dust amount.
        if wallet.available_balance < info.min_base_size {
            info!(
                product_id = %product.id,
                available = %wallet.available_balance,
                min = %info.min_base_size,
                "Insufficient base balance to sell, skipping"
            );
            return Ok(SellPlacement::Skipped {
                available: wallet.available_balance,
                min_base_size: info.min_base_size,
            });
        }

        let base_size = round_to(wallet.available_balance, self.config.base_precision);
        let sell_token = Uuid::new_v4().to_string();

        let sell = exchange
            .limit_sell_gtc(&sell_token, &product.id, base_size, limit_price)
            .await?;

        if !sell.success {
            anyhow::bail!(
                "sell rejected: {}",
                sell.failure_reason
                    .unwrap_or_else(|| "rejected by exchange".to_string())
            );
        }

        let order_id = sell.order_id.unwrap_or_else(|| "unknown".to_string());
        info!(
            product_id = %product.id,
            order_id = %order_id,
            limit_price = %limit_price,
            base_size = %base_size,
            "Sell order placed"
        );

        Ok(SellPlacement::Placed {
            order_id,
            limit_price,
            base_size,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
