//! Mock exchange for integration testing.
//!
//! Provides a deterministic `SpotExchange` implementation that serves
//! known accounts, products, and prices, records every order
//! submission, and can fail on command, all in-memory with no
//! external dependencies.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use surge::exchange::SpotExchange;
use surge::types::{
    Account, OpenOrder, OrderResult, OrderSide, OrderStatus, Product, ProductKind, Ticker,
};

/// A recorded order submission (buy or sell).
#[derive(Debug, Clone)]
pub struct SubmittedOrder {
    pub client_order_id: String,
    pub product_id: String,
    pub side: OrderSide,
    pub quote_size: Option<Decimal>,
    pub base_size: Option<Decimal>,
    pub limit_price: Option<Decimal>,
}

/// A deterministic spot exchange for testing.
///
/// Accounts are looked up by id or currency code, mirroring the live
/// exchange's behaviour. Base-currency balances are preconfigured to
/// whatever the simulated buy fill should leave behind.
pub struct MockExchange {
    accounts: HashMap<String, Account>,
    open_orders: Vec<OpenOrder>,
    products: Vec<Product>,
    tickers: HashMap<String, Decimal>,
    submitted: Mutex<Vec<SubmittedOrder>>,
    /// Product ids whose market buy dies with a transport error.
    buy_transport_failures: HashSet<String>,
    /// If set, every operation returns this error.
    force_error: Mutex<Option<String>>,
}

impl MockExchange {
    /// Create a mock with a single quote account.
    pub fn new(quote_account_id: &str, quote_currency: &str, balance: Decimal) -> Self {
        let account = Account {
            id: quote_account_id.to_string(),
            currency: quote_currency.to_string(),
            available_balance: balance,
        };
        let mut accounts = HashMap::new();
        accounts.insert(account.id.clone(), account.clone());
        accounts.insert(account.currency.clone(), account);

        Self {
            accounts,
            open_orders: Vec::new(),
            products: Vec::new(),
            tickers: HashMap::new(),
            submitted: Mutex::new(Vec::new()),
            buy_transport_failures: HashSet::new(),
            force_error: Mutex::new(None),
        }
    }

    pub fn with_products(mut self, products: Vec<Product>) -> Self {
        self.products = products;
        self
    }

    /// Register an open sell order for a product (a held position).
    pub fn with_open_sell(mut self, product_id: &str) -> Self {
        self.open_orders.push(OpenOrder {
            product_id: product_id.to_string(),
            side: OrderSide::Sell,
            status: OrderStatus::Open,
        });
        self
    }

    /// Preconfigure a base-currency balance, as left by a filled buy.
    pub fn with_base_balance(mut self, currency: &str, balance: Decimal) -> Self {
        self.accounts.insert(
            currency.to_string(),
            Account {
                id: format!("{currency}-wallet"),
                currency: currency.to_string(),
                available_balance: balance,
            },
        );
        self
    }

    pub fn with_ticker(mut self, product_id: &str, price: Decimal) -> Self {
        self.tickers.insert(product_id.to_string(), price);
        self
    }

    /// Make this product's market buy fail with a transport error.
    pub fn fail_buys_for(mut self, product_id: &str) -> Self {
        self.buy_transport_failures.insert(product_id.to_string());
        self
    }

    /// Force all subsequent operations to return an error.
    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    /// Get all order submissions recorded so far.
    pub fn submissions(&self) -> Vec<SubmittedOrder> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn submitted_buys(&self) -> Vec<SubmittedOrder> {
        self.submissions()
            .into_iter()
            .filter(|o| o.side == OrderSide::Buy)
            .collect()
    }

    pub fn submitted_sells(&self) -> Vec<SubmittedOrder> {
        self.submissions()
            .into_iter()
            .filter(|o| o.side == OrderSide::Sell)
            .collect()
    }

    fn check_forced_error(&self) -> Result<()> {
        if let Some(msg) = self.force_error.lock().unwrap().as_ref() {
            return Err(anyhow!("{msg}"));
        }
        Ok(())
    }
}

#[async_trait]
impl SpotExchange for MockExchange {
    async fn list_accounts(&self) -> Result<Vec<Account>> {
        self.check_forced_error()?;
        Ok(self.accounts.values().cloned().collect())
    }

    async fn get_account(&self, account_ref: &str) -> Result<Account> {
        self.check_forced_error()?;
        self.accounts
            .get(account_ref)
            .cloned()
            .ok_or_else(|| anyhow!("account not found: {account_ref}"))
    }

    async fn list_open_orders(
        &self,
        side: OrderSide,
        status: OrderStatus,
    ) -> Result<Vec<OpenOrder>> {
        self.check_forced_error()?;
        Ok(self
            .open_orders
            .iter()
            .filter(|o| o.side == side && o.status == status)
            .cloned()
            .collect())
    }

    async fn list_products(&self, _kind: ProductKind) -> Result<Vec<Product>> {
        self.check_forced_error()?;
        Ok(self.products.clone())
    }

    async fn get_product(&self, product_id: &str) -> Result<Product> {
        self.check_forced_error()?;
        self.products
            .iter()
            .find(|p| p.id == product_id)
            .cloned()
            .ok_or_else(|| anyhow!("product not found: {product_id}"))
    }

    async fn get_ticker(&self, product_id: &str) -> Result<Ticker> {
        self.check_forced_error()?;
        self.tickers
            .get(product_id)
            .map(|&price| Ticker { price })
            .ok_or_else(|| anyhow!("no ticker for {product_id}"))
    }

    async fn market_buy(
        &self,
        client_order_id: &str,
        product_id: &str,
        quote_size: Decimal,
    ) -> Result<OrderResult> {
        self.check_forced_error()?;
        if self.buy_transport_failures.contains(product_id) {
            return Err(anyhow!("connection reset by peer"));
        }

        self.submitted.lock().unwrap().push(SubmittedOrder {
            client_order_id: client_order_id.to_string(),
            product_id: product_id.to_string(),
            side: OrderSide::Buy,
            quote_size: Some(quote_size),
            base_size: None,
            limit_price: None,
        });

        Ok(OrderResult::accepted(format!("buy-{product_id}")))
    }

    async fn limit_sell_gtc(
        &self,
        client_order_id: &str,
        product_id: &str,
        base_size: Decimal,
        limit_price: Decimal,
    ) -> Result<OrderResult> {
        self.check_forced_error()?;

        self.submitted.lock().unwrap().push(SubmittedOrder {
            client_order_id: client_order_id.to_string(),
            product_id: product_id.to_string(),
            side: OrderSide::Sell,
            quote_size: None,
            base_size: Some(base_size),
            limit_price: Some(limit_price),
        });

        Ok(OrderResult::accepted(format!("sell-{product_id}")))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
