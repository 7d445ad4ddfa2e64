//! Exchange integrations.
//!
//! Defines the `SpotExchange` trait, the entire external boundary of
//! the agent, and the live Coinbase Advanced Trade client.

pub mod coinbase;

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::types::{
    Account, OpenOrder, OrderResult, OrderSide, OrderStatus, Product, ProductKind, Ticker,
};

#[cfg(test)]
use mockall::automock;

/// Abstraction over a spot exchange's trading API.
///
/// All reads return fresh snapshots; the exchange mutates account
/// balances externally as orders fill. Submission calls take a
/// client-generated idempotency token so a retried request is not
/// double-executed.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SpotExchange: Send + Sync {
    /// Fetch all accounts (one per currency), used for startup
    /// diagnostics and credential verification.
    async fn list_accounts(&self) -> Result<Vec<Account>>;

    /// Fetch a single account. The exchange accepts either an account
    /// identifier or a currency code here.
    async fn get_account(&self, account_ref: &str) -> Result<Account>;

    /// Fetch orders matching the given side and status.
    async fn list_open_orders(
        &self,
        side: OrderSide,
        status: OrderStatus,
    ) -> Result<Vec<OpenOrder>>;

    /// Fetch the product universe of the given kind.
    async fn list_products(&self, kind: ProductKind) -> Result<Vec<Product>>;

    /// Fetch a single product (for its current minimum base size).
    async fn get_product(&self, product_id: &str) -> Result<Product>;

    /// Fetch the latest trade price for a product.
    async fn get_ticker(&self, product_id: &str) -> Result<Ticker>;

    /// Submit a market buy sized in quote currency.
    async fn market_buy(
        &self,
        client_order_id: &str,
        product_id: &str,
        quote_size: Decimal,
    ) -> Result<OrderResult>;

    /// Submit a good-till-cancelled limit sell sized in base currency.
    async fn limit_sell_gtc(
        &self,
        client_order_id: &str,
        product_id: &str,
        base_size: Decimal,
        limit_price: Decimal,
    ) -> Result<OrderResult>;

    /// Exchange name for logging and identification.
    fn name(&self) -> &str;
}
