//! Candidate selector.
//!
//! Filters the product universe down to assets eligible for a new
//! position: settles in the cap currency, 24h momentum strictly above
//! the threshold, and not already being sold.

use rust_decimal::Decimal;
use std::collections::HashSet;
use tracing::debug;

use crate::types::Product;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Selector configuration.
#[derive(Debug, Clone)]
pub struct SelectorConfig {
    /// Minimum 24h price change (percent) for candidacy. Strictly
    /// greater-than: a product at exactly the threshold is excluded.
    pub momentum_threshold_pct: Decimal,
    /// Products must settle in this currency.
    pub quote_currency: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            momentum_threshold_pct: Decimal::from(6),
            quote_currency: "USDC".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Selector
// ---------------------------------------------------------------------------

pub struct CandidateSelector {
    config: SelectorConfig,
}

impl CandidateSelector {
    pub fn new(config: SelectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    /// Return the ordered subsequence of `products` eligible for a new
    /// position. `held` is the set of product ids with an open sell
    /// order; those are skipped to avoid doubling up. Input order is
    /// preserved (no re-sorting).
    pub fn select(&self, products: &[Product], held: &HashSet<String>) -> Vec<Product> {
        let candidates: Vec<Product> = products
            .iter()
            .filter(|p| p.quote_currency() == self.config.quote_currency)
            .filter(|p| {
                p.price_change_24h_pct
                    .map(|change| change > self.config.momentum_threshold_pct)
                    .unwrap_or(false)
            })
            .filter(|p| !held.contains(&p.id))
            .cloned()
            .collect();

        debug!(
            universe = products.len(),
            held = held.len(),
            candidates = candidates.len(),
            threshold = %self.config.momentum_threshold_pct,
            "Candidate selection complete"
        );

        candidates
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
