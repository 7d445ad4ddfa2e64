//! Coinbase Advanced Trade integration.
//!
//! Live spot trading venue. Base URL: https://api.coinbase.com/api/v3/brokerage
//!
//! All amounts cross the wire as decimal strings; responses are
//! deserialized into private wire structs and converted to domain types
//! at the boundary. Order submissions come back with a `success` flag
//! even on HTTP 200; an exchange-side rejection is not a transport
//! error and is surfaced as `OrderResult { success: false, .. }`.
//!
//! Auth: a pre-issued bearer credential resolved from the environment.
//! Request signing is deliberately out of scope here.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::SpotExchange;
use crate::types::{
    Account, ExchangeApiError, OpenOrder, OrderResult, OrderSide, OrderStatus, Product,
    ProductKind, Ticker,
};

const EXCHANGE_NAME: &str = "coinbase";

// ---------------------------------------------------------------------------
// API response types (Coinbase JSON → Rust)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct AccountsEnvelope {
    #[serde(default)]
    accounts: Vec<WireAccount>,
}

#[derive(Debug, Deserialize)]
struct AccountEnvelope {
    account: WireAccount,
}

#[derive(Debug, Deserialize)]
struct WireAccount {
    uuid: String,
    currency: String,
    available_balance: WireBalance,
}

#[derive(Debug, Deserialize)]
struct WireBalance {
    value: String,
}

#[derive(Debug, Deserialize)]
struct OrdersEnvelope {
    #[serde(default)]
    orders: Vec<WireOrder>,
}

#[derive(Debug, Deserialize)]
struct WireOrder {
    product_id: String,
    side: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct ProductsEnvelope {
    #[serde(default)]
    products: Vec<WireProduct>,
}

#[derive(Debug, Deserialize)]
struct WireProduct {
    product_id: String,
    /// Empty string for products with no 24h history.
    #[serde(default)]
    price_percentage_change_24h: Option<String>,
    #[serde(default)]
    base_min_size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireTicker {
    price: String,
}

/// Response from `POST /orders`. The exchange reports rejections in-band.
#[derive(Debug, Deserialize)]
struct WireOrderResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    success_response: Option<WireOrderSuccess>,
    #[serde(default)]
    error_response: Option<WireOrderError>,
}

#[derive(Debug, Deserialize)]
struct WireOrderSuccess {
    #[serde(default)]
    order_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireOrderError {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

// ---------------------------------------------------------------------------
// Wire → domain conversion
// ---------------------------------------------------------------------------

fn parse_decimal(raw: &str, endpoint: &str, field: &str) -> Result<Decimal> {
    raw.parse().map_err(|_| {
        ExchangeApiError::Malformed {
            endpoint: endpoint.to_string(),
            message: format!("{field} is not a decimal: {raw:?}"),
        }
        .into()
    })
}

impl WireAccount {
    fn into_account(self, endpoint: &str) -> Result<Account> {
        let available_balance =
            parse_decimal(&self.available_balance.value, endpoint, "available_balance")?;
        Ok(Account {
            id: self.uuid,
            currency: self.currency,
            available_balance,
        })
    }
}

impl WireProduct {
    fn into_product(self) -> Product {
        // Absent, empty, or unparseable 24h change all mean "no momentum
        // signal"; the selector treats None as ineligible.
        let price_change_24h_pct = self
            .price_percentage_change_24h
            .as_deref()
            .filter(|s| !s.is_empty())
            .and_then(|s| match s.parse() {
                Ok(d) => Some(d),
                Err(_) => {
                    warn!(product_id = %self.product_id, raw = s, "Unparseable 24h change");
                    None
                }
            });

        let min_base_size = self
            .base_min_size
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(Decimal::ZERO);

        Product {
            id: self.product_id,
            price_change_24h_pct,
            min_base_size,
        }
    }
}

impl WireOrderResponse {
    fn into_order_result(self) -> OrderResult {
        OrderResult {
            success: self.success,
            order_id: self.success_response.and_then(|s| s.order_id),
            failure_reason: self
                .error_response
                .map(|e| e.message.or(e.error).unwrap_or_else(|| "unknown".into())),
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Coinbase Advanced Trade client.
pub struct CoinbaseClient {
    http: Client,
    api_key: SecretString,
    base_url: String,
}

impl CoinbaseClient {
    /// Create a new client against the given brokerage base URL.
    pub fn new(base_url: String, api_key: SecretString, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent("SURGE/0.1.0 (spot-trading-agent)")
            .build()
            .context("Failed to build HTTP client for Coinbase")?;

        Ok(Self {
            http,
            api_key,
            base_url,
        })
    }

    // -- API helpers -------------------------------------------------------

    /// Authenticated GET returning deserialized JSON.
    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}/{path}", self.base_url);

        debug!(url = %url, "Coinbase API request");

        let resp = self
            .http
            .get(&url)
            .bearer_auth(self.api_key.expose_secret())
            .send()
            .await
            .with_context(|| format!("Coinbase {path} request failed"))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ExchangeApiError::Api {
                endpoint: path.to_string(),
                status: status.as_u16(),
                body,
            }
            .into());
        }

        resp.json()
            .await
            .with_context(|| format!("Failed to parse Coinbase {path} response"))
    }

    /// Submit an order payload and map the in-band success/error shape.
    async fn submit_order(&self, body: serde_json::Value) -> Result<OrderResult> {
        let url = format!("{}/orders", self.base_url);

        debug!(url = %url, body = %body, "Coinbase order submission");

        let resp = self
            .http
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .context("Coinbase order submission failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(ExchangeApiError::Api {
                endpoint: "orders".to_string(),
                status: status.as_u16(),
                body: text,
            }
            .into());
        }

        let wire: WireOrderResponse = resp
            .json()
            .await
            .context("Failed to parse Coinbase order response")?;

        Ok(wire.into_order_result())
    }
}

#[async_trait]
impl SpotExchange for CoinbaseClient {
    async fn list_accounts(&self) -> Result<Vec<Account>> {
        let envelope: AccountsEnvelope = self.get_json("accounts").await?;
        envelope
            .accounts
            .into_iter()
            .map(|a| a.into_account("accounts"))
            .collect()
    }

    async fn get_account(&self, account_ref: &str) -> Result<Account> {
        let path = format!("accounts/{account_ref}");
        let envelope: AccountEnvelope = self.get_json(&path).await?;
        envelope.account.into_account(&path)
    }

    async fn list_open_orders(
        &self,
        side: OrderSide,
        status: OrderStatus,
    ) -> Result<Vec<OpenOrder>> {
        let path = format!("orders/historical/batch?order_side={side}&order_status={status}");
        let envelope: OrdersEnvelope = self.get_json(&path).await?;

        // Orders with a side or status we don't model are dropped rather
        // than failing the listing.
        let orders = envelope
            .orders
            .into_iter()
            .filter_map(|o| {
                let side = o.side.parse().ok()?;
                let status = o.status.parse().ok()?;
                Some(OpenOrder {
                    product_id: o.product_id,
                    side,
                    status,
                })
            })
            .collect();

        Ok(orders)
    }

    async fn list_products(&self, kind: ProductKind) -> Result<Vec<Product>> {
        let path = format!("products?product_type={}", kind.as_query());
        let envelope: ProductsEnvelope = self.get_json(&path).await?;
        Ok(envelope
            .products
            .into_iter()
            .map(WireProduct::into_product)
            .collect())
    }

    async fn get_product(&self, product_id: &str) -> Result<Product> {
        let wire: WireProduct = self.get_json(&format!("products/{product_id}")).await?;
        Ok(wire.into_product())
    }

    async fn get_ticker(&self, product_id: &str) -> Result<Ticker> {
        let path = format!("products/{product_id}/ticker");
        let wire: WireTicker = self.get_json(&path).await?;
        let price = parse_decimal(&wire.price, &path, "price")?;
        Ok(Ticker { price })
    }

    async fn market_buy(
        &self,
        client_order_id: &str,
        product_id: &str,
        quote_size: Decimal,
    ) -> Result<OrderResult> {
        info!(product_id, quote_size = %quote_size, "Submitting market buy");

        self.submit_order(serde_json::json!({
            "client_order_id": client_order_id,
            "product_id": product_id,
            "side": "BUY",
            "order_configuration": {
                "market_market_ioc": {
                    "quote_size": quote_size.to_string(),
                }
            }
        }))
        .await
    }

    async fn limit_sell_gtc(
        &self,
        client_order_id: &str,
        product_id: &str,
        base_size: Decimal,
        limit_price: Decimal,
    ) -> Result<OrderResult> {
        info!(
            product_id,
            base_size = %base_size,
            limit_price = %limit_price,
            "Submitting GTC limit sell"
        );

        self.submit_order(serde_json::json!({
            "client_order_id": client_order_id,
            "product_id": product_id,
            "side": "SELL",
            "order_configuration": {
                "limit_limit_gtc": {
                    "base_size": base_size.to_string(),
                    "limit_price": limit_price.to_string(),
                    "post_only": false,
                }
            }
        }))
        .await
    }

    fn name(&self) -> &str {
        EXCHANGE_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
