//! Session orchestrator.
//!
//! Sequences one trading cycle: fetch the account/order/product
//! snapshots, select candidates, allocate capital, execute, and
//! aggregate the outcomes into a `SessionReport`. Pre-planning fetch
//! failures abort the whole cycle; per-asset failures never do.

use anyhow::{Context, Result};
use chrono::Utc;
use std::collections::HashSet;
use tracing::info;

use crate::engine::allocator::CapitalAllocator;
use crate::engine::executor::OrderExecutor;
use crate::engine::selector::CandidateSelector;
use crate::exchange::SpotExchange;
use crate::types::{OrderSide, OrderStatus, ProductKind, SessionReport};

pub struct TradingSession {
    selector: CandidateSelector,
    allocator: CapitalAllocator,
    executor: OrderExecutor,
}

impl TradingSession {
    pub fn new(
        selector: CandidateSelector,
        allocator: CapitalAllocator,
        executor: OrderExecutor,
    ) -> Self {
        Self {
            selector,
            allocator,
            executor,
        }
    }

    /// Run one complete trading cycle against `exchange`.
    ///
    /// Returns `Err` only if the initial account/order/product fetches
    /// fail; everything after planning is absorbed into per-asset
    /// outcomes.
    pub async fn run(
        &self,
        exchange: &dyn SpotExchange,
        quote_account_id: &str,
    ) -> Result<SessionReport> {
        // -- Data fetch ---------------------------------------------------
        let account = exchange
            .get_account(quote_account_id)
            .await
            .context("Failed to fetch quote account")?;
        info!(
            currency = %account.currency,
            balance = %account.available_balance,
            "Quote account balance"
        );

        let open_sells = exchange
            .list_open_orders(OrderSide::Sell, OrderStatus::Open)
            .await
            .context("Failed to fetch open sell orders")?;
        let held: HashSet<String> = open_sells.into_iter().map(|o| o.product_id).collect();
        if held.is_empty() {
            info!("Currently selling: none");
        } else {
            let mut ids: Vec<&str> = held.iter().map(String::as_str).collect();
            ids.sort_unstable();
            info!(products = ids.join(", "), "Currently selling");
        }

        let products = exchange
            .list_products(ProductKind::Spot)
            .await
            .context("Failed to fetch product listings")?;
        let products_scanned = products.len();

        // -- Planning -----------------------------------------------------
        let candidates = self.selector.select(&products, &held);
        let candidates_found = candidates.len();
        info!(
            scanned = products_scanned,
            candidates = candidates_found,
            "Found potential products to buy"
        );

        let plan = self
            .allocator
            .allocate(account.available_balance, candidates);

        if plan.is_empty() {
            info!("Not enough balance to buy any products");
            return Ok(SessionReport::empty_plan(products_scanned, candidates_found));
        }

        info!(
            orders = plan.len(),
            spend_per_asset = %plan.spend_per_asset(),
            "Allocation plan ready"
        );

        // -- Execution ----------------------------------------------------
        let outcomes = self.executor.execute_plan(exchange, &plan).await;

        Ok(SessionReport {
            products_scanned,
            candidates_found,
            orders_planned: plan.len(),
            spend_per_asset: plan.spend_per_asset(),
            outcomes,
            completed_at: Utc::now(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
