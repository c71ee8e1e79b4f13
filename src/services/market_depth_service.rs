use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::market::{OrderSide, ShareOrder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthError {
    InvalidQuantity,
    /// Nothing resting on the opposing side of the book.
    NoLiquidity,
}

impl std::fmt::Display for DepthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DepthError::InvalidQuantity => write!(f, "Order quantity must be positive"),
            DepthError::NoLiquidity => write!(f, "No open orders on the opposing side"),
        }
    }
}

impl std::error::Error for DepthError {}

#[derive(Debug, Clone, Serialize)]
pub struct DepthLevel {
    /// Minor units per share.
    pub price: i64,
    pub quantity: i64,
    /// Cumulative notional (price x quantity) from the top of this side.
    pub total: i64,
    /// Level quantity relative to the largest level in the book, percent.
    /// Display scaling only, not a liquidity metric.
    pub depth: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderBookDepth {
    pub bids: Vec<DepthLevel>,
    pub asks: Vec<DepthLevel>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketOrderEstimate {
    pub requested_quantity: i64,
    pub filled_quantity: i64,
    pub fully_filled: bool,
    /// Exact cost of the filled quantity in minor units.
    pub total_cost: i64,
    /// Quantity-weighted average fill price.
    pub average_price: f64,
    pub best_price: i64,
    /// Deviation of the average fill from top-of-book, percent.
    pub impact_pct: f64,
}

pub struct MarketDepthService;

impl MarketDepthService {
    /// Aggregate open orders into a display-ready depth table: bids sorted
    /// descending, asks ascending, cumulative notionals per side.
    pub fn depth_table(orders: &[ShareOrder]) -> OrderBookDepth {
        let bid_levels = Self::aggregate(orders, OrderSide::Buy);
        let ask_levels = Self::aggregate(orders, OrderSide::Sell);

        let max_quantity = bid_levels
            .values()
            .chain(ask_levels.values())
            .copied()
            .max()
            .unwrap_or(0);

        let bids = Self::build_side(bid_levels.into_iter().rev().collect(), max_quantity);
        let asks = Self::build_side(ask_levels.into_iter().collect(), max_quantity);

        OrderBookDepth { bids, asks }
    }

    /// Estimate the execution of a market order by walking the opposing
    /// side best-first. Short liquidity is reported, not an error.
    pub fn estimate_market_order(
        side: OrderSide,
        quantity: i64,
        orders: &[ShareOrder],
    ) -> Result<MarketOrderEstimate, DepthError> {
        if quantity <= 0 {
            return Err(DepthError::InvalidQuantity);
        }

        let levels = Self::aggregate(orders, side.opposite());
        if levels.is_empty() {
            return Err(DepthError::NoLiquidity);
        }

        // A buy consumes asks from the cheapest up, a sell consumes bids
        // from the highest down.
        let walk: Vec<(i64, i64)> = match side {
            OrderSide::Buy => levels.into_iter().collect(),
            OrderSide::Sell => levels.into_iter().rev().collect(),
        };

        let best_price = walk[0].0;
        let mut remaining = quantity;
        let mut filled = 0i64;
        let mut total_cost = 0i64;

        for (price, available) in walk {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(available);
            total_cost += price * take;
            filled += take;
            remaining -= take;
        }

        let average_price = total_cost as f64 / filled as f64;
        let impact_pct = ((average_price - best_price as f64) / best_price as f64 * 100.0).abs();

        Ok(MarketOrderEstimate {
            requested_quantity: quantity,
            filled_quantity: filled,
            fully_filled: remaining == 0,
            total_cost,
            average_price,
            best_price,
            impact_pct,
        })
    }

    fn aggregate(orders: &[ShareOrder], side: OrderSide) -> BTreeMap<i64, i64> {
        let mut levels = BTreeMap::new();
        for order in orders.iter().filter(|o| o.side == side) {
            *levels.entry(order.price).or_insert(0) += order.quantity;
        }
        levels
    }

    fn build_side(levels: Vec<(i64, i64)>, max_quantity: i64) -> Vec<DepthLevel> {
        let mut cumulative = 0i64;
        levels
            .into_iter()
            .map(|(price, quantity)| {
                cumulative += price * quantity;
                let depth = if max_quantity > 0 {
                    quantity as f64 / max_quantity as f64 * 100.0
                } else {
                    0.0
                };
                DepthLevel {
                    price,
                    quantity,
                    total: cumulative,
                    depth,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::market::OrderStatus;
    use mongodb::bson::oid::ObjectId;

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
    fn bids_descend_and_asks_ascend() {
        let orders = vec![
            order(OrderSide::Buy, 900, 10),
            order(OrderSide::Buy, 950, 5),
            order(OrderSide::Sell, 1100, 7),
            order(OrderSide::Sell, 1000, 3),
        ];
        let depth = MarketDepthService::depth_table(&orders);

        assert_eq!(
            depth.bids.iter().map(|l| l.price).collect::<Vec<_>>(),
            vec![950, 900]
        );
        assert_eq!(
            depth.asks.iter().map(|l| l.price).collect::<Vec<_>>(),
            vec![1000, 1100]
        );
    }

    #[test]
    fn same_price_orders_merge_into_one_level() {
        let orders = vec![
            order(OrderSide::Buy, 900, 10),
            order(OrderSide::Buy, 900, 15),
        ];
        let depth = MarketDepthService::depth_table(&orders);
        assert_eq!(depth.bids.len(), 1);
        assert_eq!(depth.bids[0].quantity, 25);
    }

    #[test]
    fn cumulative_totals_are_monotone() {
        let orders = vec![
            order(OrderSide::Sell, 1000, 3),
            order(OrderSide::Sell, 1100, 7),
            order(OrderSide::Sell, 1200, 2),
        ];
        let depth = MarketDepthService::depth_table(&orders);
        assert_eq!(depth.asks[0].total, 3000);
        assert_eq!(depth.asks[1].total, 3000 + 7700);
        assert_eq!(depth.asks[2].total, 3000 + 7700 + 2400);
    }

    #[test]
    fn depth_is_relative_to_largest_level() {
        let orders = vec![
            order(OrderSide::Buy, 900, 20),
            order(OrderSide::Sell, 1000, 5),
        ];
        let depth = MarketDepthService::depth_table(&orders);
        assert_eq!(depth.bids[0].depth, 100.0);
        assert_eq!(depth.asks[0].depth, 25.0);
    }

    #[test]
    fn market_buy_walks_asks_from_best() {
        let orders = vec![
            order(OrderSide::Sell, 1000, 3),
            order(OrderSide::Sell, 1100, 7),
        ];
        let estimate =
            MarketDepthService::estimate_market_order(OrderSide::Buy, 5, &orders).unwrap();

        assert_eq!(estimate.best_price, 1000);
        assert_eq!(estimate.filled_quantity, 5);
        assert!(estimate.fully_filled);
        // 3 @ 1000 + 2 @ 1100
        assert_eq!(estimate.total_cost, 5200);
        assert_eq!(estimate.average_price, 1040.0);
        assert!((estimate.impact_pct - 4.0).abs() < 1e-9);
    }

    #[test]
    fn market_sell_walks_bids_from_best() {
        let orders = vec![
            order(OrderSide::Buy, 950, 4),
            order(OrderSide::Buy, 900, 10),
        ];
        let estimate =
            MarketDepthService::estimate_market_order(OrderSide::Sell, 6, &orders).unwrap();

        assert_eq!(estimate.best_price, 950);
        // 4 @ 950 + 2 @ 900
        assert_eq!(estimate.total_cost, 5600);
        assert!(estimate.average_price < 950.0);
        assert!(estimate.impact_pct > 0.0);
    }

    #[test]
    fn top_of_book_fill_has_zero_impact() {
        let orders = vec![order(OrderSide::Sell, 1000, 10)];
        let estimate =
            MarketDepthService::estimate_market_order(OrderSide::Buy, 10, &orders).unwrap();
        assert_eq!(estimate.impact_pct, 0.0);
        assert_eq!(estimate.average_price, 1000.0);
    }

    #[test]
    fn short_liquidity_reports_partial_fill() {
        let orders = vec![order(OrderSide::Sell, 1000, 4)];
        let estimate =
            MarketDepthService::estimate_market_order(OrderSide::Buy, 10, &orders).unwrap();
        assert!(!estimate.fully_filled);
        assert_eq!(estimate.filled_quantity, 4);
        assert_eq!(estimate.total_cost, 4000);
    }

    #[test]
    fn empty_opposing_side_is_an_error() {
        let orders = vec![order(OrderSide::Buy, 900, 10)];
        assert_eq!(
            MarketDepthService::estimate_market_order(OrderSide::Buy, 1, &orders).unwrap_err(),
            DepthError::NoLiquidity
        );
        assert_eq!(
            MarketDepthService::estimate_market_order(OrderSide::Sell, 0, &orders).unwrap_err(),
            DepthError::InvalidQuantity
        );
    }
}
