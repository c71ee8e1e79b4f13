use mongodb::bson::oid::ObjectId;

use propvest_api::models::market::{OrderSide, OrderStatus, ShareOrder};
use propvest_api::services::market_depth_service::{DepthError, MarketDepthService};

fn order(side: OrderSide, price: i64, quantity: i64) -> ShareOrder {
    ShareOrder {
        id: Some(ObjectId::new()),
        property_id: ObjectId::new(),
        user_id: ObjectId::new(),
        side,
        price,
        quantity,
        currency: "USD".to_string(),
        status: OrderStatus::Open,
        created_at: None,
        updated_at: None,
    }
}

#[test]
fn depth_table_matches_trading_screen_layout() {
    let orders = vec![
        order(OrderSide::Buy, 980, 12),
        order(OrderSide::Buy, 990, 4),
        order(OrderSide::Buy, 980, 8),
        order(OrderSide::Sell, 1010, 6),
        order(OrderSide::Sell, 1025, 10),
    ];

    let depth = MarketDepthService::depth_table(&orders);

    // Best bid first, best ask first.
    assert_eq!(depth.bids[0].price, 990);
    assert_eq!(depth.asks[0].price, 1010);
    // 980s merged into one level.
    assert_eq!(depth.bids[1].quantity, 20);
    // Cumulative notional for the second ask level.
    assert_eq!(depth.asks[1].total, 1010 * 6 + 1025 * 10);
    // The 20-share level is the largest in the book.
    assert_eq!(depth.bids[1].depth, 100.0);
}

#[test]
fn market_order_estimate_walks_and_reports_impact() {
    let orders = vec![
        order(OrderSide::Sell, 1000, 5),
        order(OrderSide::Sell, 1050, 5),
    ];

    let estimate = MarketDepthService::estimate_market_order(OrderSide::Buy, 8, &orders).unwrap();

    assert!(estimate.fully_filled);
    assert_eq!(estimate.total_cost, 5 * 1000 + 3 * 1050);
    assert!(estimate.average_price > 1000.0 && estimate.average_price < 1050.0);
    assert!(estimate.impact_pct > 0.0);

    // Average never leaves the band of consumed levels.
    assert!(estimate.average_price >= estimate.best_price as f64);
}

#[test]
fn one_sided_book_cannot_quote_the_other_side() {
    let orders = vec![order(OrderSide::Sell, 1000, 5)];
    assert_eq!(
        MarketDepthService::estimate_market_order(OrderSide::Sell, 3, &orders).unwrap_err(),
        DepthError::NoLiquidity
    );
}
