//! End-to-end cycle scenarios against the mock exchange.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashSet;
use std::time::Duration;

use surge::engine::allocator::{AllocatorConfig, CapitalAllocator};
use surge::engine::executor::{ExecutorConfig, OrderExecutor};
use surge::engine::selector::{CandidateSelector, SelectorConfig};
use surge::engine::session::TradingSession;
use surge::types::{Product, TradeOutcome};

use crate::mock_exchange::MockExchange;

fn make_product(id: &str, change: Option<Decimal>) -> Product {
    Product {
        id: id.to_string(),
        price_change_24h_pct: change,
        min_base_size: dec!(0.001),
    }
}

/// Session with default configs and no settlement wait.
fn make_session() -> TradingSession {
    TradingSession::new(
        CandidateSelector::new(SelectorConfig::default()),
        CapitalAllocator::new(AllocatorConfig::default()),
        OrderExecutor::new(ExecutorConfig {
            settlement_delay: Duration::ZERO,
            ..Default::default()
        }),
    )
}

#[tokio::test]
async fn test_full_cycle_three_candidates() {
    // Balance 1000, fraction 0.5 → cap 500; three eligible candidates
    // → 500/3 × 0.98 = 163.33 each.
    let exchange = MockExchange::new("usdc-1", "USDC", dec!(1000))
        .with_products(vec![
            make_product("A-USDC", Some(dec!(8))),
            make_product("FLAT-USDC", Some(dec!(2))),
            make_product("B-USDC", Some(dec!(10.5))),
            make_product("NEW-USDC", None),
            make_product("BTC-USD", Some(dec!(20))),
            make_product("C-USDC", Some(dec!(6.01))),
        ])
        .with_base_balance("A", dec!(120))
        .with_base_balance("B", dec!(0.37))
        .with_base_balance("C", dec!(5000))
        .with_ticker("A-USDC", dec!(2.5))
        .with_ticker("B-USDC", dec!(30000))
        .with_ticker("C-USDC", dec!(0.123456));

    let report = make_session().run(&exchange, "usdc-1").await.unwrap();

    assert_eq!(report.products_scanned, 6);
    assert_eq!(report.candidates_found, 3);
    assert_eq!(report.orders_planned, 3);
    assert_eq!(report.spend_per_asset, dec!(163.33));
    assert_eq!(report.buys_placed(), 3);
    assert_eq!(report.sells_placed(), 3);
    assert_eq!(report.failures(), 0);
    assert_eq!(report.total_committed(), dec!(489.99));

    // Buys in listing order, each for the uniform spend.
    let buys = exchange.submitted_buys();
    let buy_ids: Vec<&str> = buys.iter().map(|o| o.product_id.as_str()).collect();
    assert_eq!(buy_ids, vec!["A-USDC", "B-USDC", "C-USDC"]);
    assert!(buys.iter().all(|o| o.quote_size == Some(dec!(163.33))));

    // Sells at round(price × 1.5, 6), sized to the full base balance.
    let sells = exchange.submitted_sells();
    assert_eq!(sells.len(), 3);
    assert_eq!(sells[0].limit_price, Some(dec!(3.75)));
    assert_eq!(sells[0].base_size, Some(dec!(120)));
    assert_eq!(sells[1].limit_price, Some(dec!(45000)));
    assert_eq!(sells[1].base_size, Some(dec!(0.37)));
    assert_eq!(sells[2].limit_price, Some(dec!(0.185184)));
    assert_eq!(sells[2].base_size, Some(dec!(5000)));

    // Every submission carries its own idempotency token.
    let tokens: HashSet<String> = exchange
        .submissions()
        .iter()
        .map(|o| o.client_order_id.clone())
        .collect();
    assert_eq!(tokens.len(), 6);
}

#[tokio::test]
async fn test_breadth_shrinks_on_small_balance() {
    // Balance 10 → cap 5; ten candidates shrink to four at 1.23 each.
    let products: Vec<Product> = (0..10)
        .map(|i| make_product(&format!("AS{i}-USDC"), Some(dec!(7))))
        .collect();

    let mut exchange = MockExchange::new("usdc-1", "USDC", dec!(10)).with_products(products);
    for i in 0..4 {
        exchange = exchange
            .with_base_balance(&format!("AS{i}"), dec!(3))
            .with_ticker(&format!("AS{i}-USDC"), dec!(0.4));
    }

    let report = make_session().run(&exchange, "usdc-1").await.unwrap();

    assert_eq!(report.candidates_found, 10);
    assert_eq!(report.orders_planned, 4);
    assert_eq!(report.spend_per_asset, dec!(1.23));

    let buy_ids: Vec<String> = exchange
        .submitted_buys()
        .iter()
        .map(|o| o.product_id.clone())
        .collect();
    assert_eq!(
        buy_ids,
        vec!["AS0-USDC", "AS1-USDC", "AS2-USDC", "AS3-USDC"]
    );
}

#[tokio::test]
async fn test_buy_failure_does_not_stop_the_batch() {
    let exchange = MockExchange::new("usdc-1", "USDC", dec!(1000))
        .with_products(vec![
            make_product("BAD-USDC", Some(dec!(9))),
            make_product("GOOD-USDC", Some(dec!(8))),
        ])
        .with_base_balance("GOOD", dec!(40))
        .with_ticker("GOOD-USDC", dec!(1.25))
        .fail_buys_for("BAD-USDC");

    let report = make_session().run(&exchange, "usdc-1").await.unwrap();

    assert_eq!(report.outcomes.len(), 2);
    match &report.outcomes[0] {
        TradeOutcome::BuyFailed { product_id, reason } => {
            assert_eq!(product_id, "BAD-USDC");
            assert!(reason.contains("connection reset"));
        }
        other => panic!("expected BuyFailed, got {other:?}"),
    }
    assert!(report.outcomes[1].sell_placed());
    assert_eq!(report.failures(), 1);
    assert_eq!(report.buys_placed(), 1);

    // Only the healthy asset reached the book.
    let sells = exchange.submitted_sells();
    assert_eq!(sells.len(), 1);
    assert_eq!(sells[0].product_id, "GOOD-USDC");
}

#[tokio::test]
async fn test_dust_balance_skips_sell() {
    // Fill left less than the product minimum: the sell is skipped,
    // reported, and not counted as a failure.
    let exchange = MockExchange::new("usdc-1", "USDC", dec!(100))
        .with_products(vec![make_product("ETH-USDC", Some(dec!(7)))])
        .with_base_balance("ETH", dec!(0.0004))
        .with_ticker("ETH-USDC", dec!(2500));

    let report = make_session().run(&exchange, "usdc-1").await.unwrap();

    assert_eq!(report.buys_placed(), 1);
    assert_eq!(report.sells_placed(), 0);
    assert_eq!(report.sells_skipped(), 1);
    assert_eq!(report.failures(), 0);
    assert!(exchange.submitted_sells().is_empty());
}

#[tokio::test]
async fn test_insufficient_balance_stops_before_execution() {
    // Cap 0.75: the allocator shrinks to nothing; no orders at all.
    let exchange = MockExchange::new("usdc-1", "USDC", dec!(1.50)).with_products(vec![
        make_product("A-USDC", Some(dec!(9))),
        make_product("B-USDC", Some(dec!(11))),
    ]);

    let report = make_session().run(&exchange, "usdc-1").await.unwrap();

    assert!(report.plan_was_empty());
    assert_eq!(report.candidates_found, 2);
    assert!(report.outcomes.is_empty());
    assert!(exchange.submissions().is_empty());
}

#[tokio::test]
async fn test_held_product_is_not_bought_again() {
    let exchange = MockExchange::new("usdc-1", "USDC", dec!(500))
        .with_products(vec![
            make_product("HELD-USDC", Some(dec!(15))),
            make_product("FREE-USDC", Some(dec!(9))),
        ])
        .with_open_sell("HELD-USDC")
        .with_base_balance("FREE", dec!(80))
        .with_ticker("FREE-USDC", dec!(3));

    let report = make_session().run(&exchange, "usdc-1").await.unwrap();

    assert_eq!(report.candidates_found, 1);
    let buys = exchange.submitted_buys();
    assert_eq!(buys.len(), 1);
    assert_eq!(buys[0].product_id, "FREE-USDC");
}

#[tokio::test]
async fn test_prefetch_failure_aborts_cycle() {
    let exchange = MockExchange::new("usdc-1", "USDC", dec!(1000))
        .with_products(vec![make_product("A-USDC", Some(dec!(9)))]);
    exchange.set_error("503 Service Unavailable");

    let result = make_session().run(&exchange, "usdc-1").await;

    assert!(result.is_err());
    assert!(exchange.submissions().is_empty());
}
