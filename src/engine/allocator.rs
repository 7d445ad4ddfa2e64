//! Capital allocator.
//!
//! Converts the balance cap and the candidate list into a uniform
//! per-asset spend. Rather than rejecting low-balance runs outright,
//! breadth is traded for per-trade viability: the candidate count
//! shrinks until every planned order clears the minimum economic
//! threshold, or the plan comes out empty.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, info};

use crate::types::{round_to, AllocationPlan, PlannedBuy, Product};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Headroom held back from each allocation against price slippage and
/// taker fees between planning and fill.
const SLIPPAGE_HEADROOM: Decimal = dec!(0.98);

/// Allocator configuration.
#[derive(Debug, Clone)]
pub struct AllocatorConfig {
    /// Fraction of the available balance one cycle may commit.
    pub max_balance_fraction: Decimal,
    /// Smallest per-asset spend worth placing an order for (quote units).
    pub min_viable_spend: Decimal,
    /// Quote currency precision (decimal places).
    pub quote_precision: u32,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            max_balance_fraction: dec!(0.5),
            min_viable_spend: Decimal::ONE,
            quote_precision: 2,
        }
    }
}

// ---------------------------------------------------------------------------
// Allocator
// ---------------------------------------------------------------------------

pub struct CapitalAllocator {
    config: AllocatorConfig,
}

impl CapitalAllocator {
    pub fn new(config: AllocatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    /// Build the buy plan for this cycle.
    ///
    /// An empty plan is the normal insufficient-balance outcome, not an
    /// error. Guarantees: plan size ≤ candidate count, spend is uniform,
    /// and the total never exceeds `available_balance × max_fraction`.
    pub fn allocate(&self, available_balance: Decimal, candidates: Vec<Product>) -> AllocationPlan {
        let cap = available_balance * self.config.max_balance_fraction;

        let mut n = candidates.len();
        let mut per_asset = Self::per_asset(cap, n);

        // Shrink breadth until the per-asset spend clears the viability
        // floor; n decreases monotonically so this terminates.
        while per_asset <= self.config.min_viable_spend && n > 0 {
            n -= 1;
            per_asset = Self::per_asset(cap, n);
        }

        if n == 0 {
            info!(
                balance = %available_balance,
                cap = %cap,
                candidates = candidates.len(),
                "Balance too low for any viable allocation"
            );
            return AllocationPlan::default();
        }

        let spend = round_to(per_asset, self.config.quote_precision);

        debug!(
            cap = %cap,
            candidates = candidates.len(),
            planned = n,
            spend_per_asset = %spend,
            "Allocation plan built"
        );

        AllocationPlan {
            entries: candidates
                .into_iter()
                .take(n)
                .map(|product| PlannedBuy {
                    product,
                    quote_spend: spend,
                })
                .collect(),
        }
    }

    fn per_asset(cap: Decimal, n: usize) -> Decimal {
        if n == 0 {
            return Decimal::ZERO;
        }
        ((cap / Decimal::from(n)) * SLIPPAGE_HEADROOM).min(cap)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
