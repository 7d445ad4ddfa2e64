//! Shared types for the SURGE agent.
//!
//! These types form the data model used across all modules. Everything
//! here is a value snapshot fetched fresh each cycle; no entity has
//! identity or lifecycle beyond a single run.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Rounding
// ---------------------------------------------------------------------------

/// Round half-away-from-zero to `dp` decimal places.
///
/// All exchange-facing amounts (quote spend, limit prices, base sizes)
/// go through this. `Decimal::round_dp` defaults to banker's rounding,
/// which would turn a 1.225 spend into 1.22 instead of 1.23.
pub fn round_to(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// A spot exchange account (one per currency).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    /// Currency code, e.g. "USDC" or "BTC".
    pub currency: String,
    /// Balance available for new orders. Nonnegative.
    pub available_balance: Decimal,
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.available_balance, self.currency, self.id)
    }
}

// ---------------------------------------------------------------------------
// Product
// ---------------------------------------------------------------------------

/// A tradable spot pair, e.g. "BTC-USDC".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Pair identifier, `BASE-QUOTE`.
    pub id: String,
    /// 24-hour percentage price change. Absent for illiquid or newly
    /// listed products.
    pub price_change_24h_pct: Option<Decimal>,
    /// Smallest base-currency amount the exchange will accept in an order.
    pub min_base_size: Decimal,
}

impl Product {
    /// The asset being bought/sold ("BTC" in "BTC-USDC").
    pub fn base_currency(&self) -> &str {
        self.id.split('-').next().unwrap_or(&self.id)
    }

    /// The currency the pair settles in ("USDC" in "BTC-USDC").
    pub fn quote_currency(&self) -> &str {
        self.id.rsplit('-').next().unwrap_or("")
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.price_change_24h_pct {
            Some(change) => write!(f, "{} ({:+}% 24h)", self.id, change),
            None => write!(f, "{} (no 24h change)", self.id),
        }
    }
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// Order direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

impl FromStr for OrderSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BUY" => Ok(OrderSide::Buy),
            "SELL" => Ok(OrderSide::Sell),
            other => Err(format!("unknown order side: {other}")),
        }
    }
}

/// Order lifecycle status, as reported by the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Open,
    Filled,
    Cancelled,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Open => write!(f, "OPEN"),
            OrderStatus::Filled => write!(f, "FILLED"),
            OrderStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "OPEN" => Ok(OrderStatus::Open),
            "FILLED" => Ok(OrderStatus::Filled),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

/// Product listing type. Only spot is traded here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductKind {
    Spot,
}

impl ProductKind {
    /// Query-parameter form expected by the exchange.
    pub fn as_query(&self) -> &'static str {
        match self {
            ProductKind::Spot => "SPOT",
        }
    }
}

/// A resting order, used only to build the held-asset set (products that
/// already have an open sell and must not be bought again).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenOrder {
    pub product_id: String,
    pub side: OrderSide,
    pub status: OrderStatus,
}

/// Latest trade price for a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticker {
    pub price: Decimal,
}

/// Outcome of an order submission as reported by the exchange.
///
/// Transport failures surface as `Err` from the exchange call; an
/// exchange-side rejection comes back as `Ok` with `success == false`
/// and a reason, mirroring the wire response shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResult {
    pub success: bool,
    pub order_id: Option<String>,
    pub failure_reason: Option<String>,
}

impl OrderResult {
    pub fn accepted(order_id: impl Into<String>) -> Self {
        Self {
            success: true,
            order_id: Some(order_id.into()),
            failure_reason: None,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            order_id: None,
            failure_reason: Some(reason.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Allocation plan
// ---------------------------------------------------------------------------

/// A single planned market buy: which product, and how much quote
/// currency to spend on it.
#[derive(Debug, Clone)]
pub struct PlannedBuy {
    pub product: Product,
    pub quote_spend: Decimal,
}

/// Ordered buy plan produced by the allocator. Spend is uniform across
/// entries and the total never exceeds the balance cap.
#[derive(Debug, Clone, Default)]
pub struct AllocationPlan {
    pub entries: Vec<PlannedBuy>,
}

impl AllocationPlan {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The uniform per-asset spend (zero for an empty plan).
    pub fn spend_per_asset(&self) -> Decimal {
        self.entries
            .first()
            .map(|e| e.quote_spend)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn total_spend(&self) -> Decimal {
        self.entries.iter().map(|e| e.quote_spend).sum()
    }
}

// ---------------------------------------------------------------------------
// Trade outcomes
// ---------------------------------------------------------------------------

/// Per-asset result of the buy-then-sell sequence.
///
/// The executor never lets one asset's error escape to the batch; every
/// path through the two phases lands in exactly one of these variants.
#[derive(Debug, Clone)]
pub enum TradeOutcome {
    /// Buy filled and the protective sell is resting on the book.
    Completed {
        product_id: String,
        buy_order_id: String,
        sell_order_id: String,
        limit_price: Decimal,
        base_size: Decimal,
    },
    /// Buy filled but the resulting base balance was below the minimum
    /// tradable size, so no sell was submitted. Expected with partial
    /// fills or rounding dust, not a failure.
    SellSkipped {
        product_id: String,
        buy_order_id: String,
        available: Decimal,
        min_base_size: Decimal,
    },
    /// Buy rejected by the exchange or lost to a transport error. The
    /// sell phase never ran.
    BuyFailed { product_id: String, reason: String },
    /// Buy filled but the sell submission failed.
    SellFailed {
        product_id: String,
        buy_order_id: String,
        reason: String,
    },
}

impl TradeOutcome {
    pub fn product_id(&self) -> &str {
        match self {
            TradeOutcome::Completed { product_id, .. }
            | TradeOutcome::SellSkipped { product_id, .. }
            | TradeOutcome::BuyFailed { product_id, .. }
            | TradeOutcome::SellFailed { product_id, .. } => product_id,
        }
    }

    /// Whether the buy phase went through.
    pub fn buy_placed(&self) -> bool {
        !matches!(self, TradeOutcome::BuyFailed { .. })
    }

    /// Whether a protective sell is resting on the book.
    pub fn sell_placed(&self) -> bool {
        matches!(self, TradeOutcome::Completed { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            TradeOutcome::BuyFailed { .. } | TradeOutcome::SellFailed { .. }
        )
    }
}

impl fmt::Display for TradeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeOutcome::Completed {
                product_id,
                sell_order_id,
                limit_price,
                ..
            } => write!(f, "{product_id}: selling at {limit_price} ({sell_order_id})"),
            TradeOutcome::SellSkipped {
                product_id,
                available,
                min_base_size,
                ..
            } => write!(
                f,
                "{product_id}: bought, sell skipped ({available} < min {min_base_size})"
            ),
            TradeOutcome::BuyFailed { product_id, reason } => {
                write!(f, "{product_id}: buy failed ({reason})")
            }
            TradeOutcome::SellFailed {
                product_id, reason, ..
            } => write!(f, "{product_id}: bought, sell failed ({reason})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Session report
// ---------------------------------------------------------------------------

/// Aggregate of one trading cycle, owned by the orchestrator.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub products_scanned: usize,
    pub candidates_found: usize,
    pub orders_planned: usize,
    /// Uniform per-asset quote spend (zero when the plan was empty).
    pub spend_per_asset: Decimal,
    pub outcomes: Vec<TradeOutcome>,
    pub completed_at: DateTime<Utc>,
}

impl SessionReport {
    /// Report for a cycle that stopped before execution because the
    /// allocator produced no viable plan.
    pub fn empty_plan(products_scanned: usize, candidates_found: usize) -> Self {
        Self {
            products_scanned,
            candidates_found,
            orders_planned: 0,
            spend_per_asset: Decimal::ZERO,
            outcomes: Vec::new(),
            completed_at: Utc::now(),
        }
    }

    pub fn plan_was_empty(&self) -> bool {
        self.orders_planned == 0
    }

    pub fn buys_placed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.buy_placed()).count()
    }

    pub fn sells_placed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.sell_placed()).count()
    }

    pub fn sells_skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, TradeOutcome::SellSkipped { .. }))
            .count()
    }

    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }

    /// Quote currency committed to filled buys this cycle.
    pub fn total_committed(&self) -> Decimal {
        self.spend_per_asset * Decimal::from(self.buys_placed())
    }
}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scanned={} candidates={} planned={} buys={} sells={} skipped={} failed={} committed={}",
            self.products_scanned,
            self.candidates_found,
            self.orders_planned,
            self.buys_placed(),
            self.sells_placed(),
            self.sells_skipped(),
            self.failures(),
            self.total_committed(),
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Structured failures from the live exchange client.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeApiError {
    #[error("exchange API error on {endpoint} ({status}): {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("malformed {endpoint} response: {message}")]
    Malformed { endpoint: String, message: String },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
