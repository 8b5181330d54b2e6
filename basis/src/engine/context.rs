use crate::{config::TradingParams, manager::VenueRole};
use basis_execution::order::{Order, id::OrderId};
use basis_instrument::{Side, symbol::Symbol};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::Signed;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// States of the arbitrage state machine.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Idle,
    Initializing,
    Monitoring,
    Analyzing,
    Executing,
    ErrorRecovery,
}

/// Direction of an arbitrage entry.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Buy spot at the ask, sell futures at the bid.
    SpotToFutures,
    /// Buy futures at the ask, sell spot at the bid.
    FuturesToSpot,
}

/// Maximum age of an [`ArbitrageOpportunity`] before it is considered stale.
pub const OPPORTUNITY_MAX_AGE: chrono::TimeDelta = chrono::TimeDelta::seconds(5);

/// A detected entry opportunity at one observation instant.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ArbitrageOpportunity {
    pub direction: Direction,
    /// Entry cost percentage - negative when the mispricing favours us.
    pub spread_pct: Decimal,
    /// Executable buy price (ask on the buy leg).
    pub buy_price: Decimal,
    /// Executable sell price (bid on the sell leg).
    pub sell_price: Decimal,
    /// Maximum executable quantity given book depth and position limits.
    pub max_quantity: Decimal,
    pub time: DateTime<Utc>,
}

impl ArbitrageOpportunity {
    /// An opportunity aged exactly the maximum is already stale.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now - self.time < OPPORTUNITY_MAX_AGE
    }

    /// Estimated profit per unit at the observed prices.
    pub fn estimated_profit_per_unit(&self) -> Decimal {
        self.sell_price - self.buy_price
    }
}

/// Signed position on one venue, maintained from processed fills.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Position {
    /// Signed quantity - positive long, negative short.
    pub signed_quantity: Decimal,
    /// Volume-weighted average entry price.
    pub avg_price: Decimal,
}

impl Position {
    /// Apply a fill, updating the volume-weighted average price.
    ///
    /// Returns the realised quote profit of any closed quantity.
    pub fn apply_fill(&mut self, side: Side, quantity: Decimal, price: Decimal) -> Decimal {
        let signed_change = match side {
            Side::Buy => quantity,
            Side::Sell => -quantity,
        };

        // Quantity closed against the existing position, if the fill opposes it
        let realised = if !self.signed_quantity.is_zero()
            && signed_change.signum() != self.signed_quantity.signum()
        {
            let closed = quantity.min(self.signed_quantity.abs());
            if self.signed_quantity.is_sign_positive() {
                (price - self.avg_price) * closed
            } else {
                (self.avg_price - price) * closed
            }
        } else {
            Decimal::ZERO
        };

        let new_quantity = self.signed_quantity + signed_change;
        if new_quantity.is_zero() {
            self.signed_quantity = Decimal::ZERO;
            self.avg_price = Decimal::ZERO;
            return realised;
        }

        if self.signed_quantity.is_zero()
            || self.signed_quantity.is_sign_positive() != new_quantity.is_sign_positive()
        {
            // Opened or flipped - the entry price resets
            self.avg_price = price;
        } else if signed_change.signum() == self.signed_quantity.signum() {
            // Increased - weight the average by quantity
            let total_cost =
                (self.signed_quantity.abs() * self.avg_price) + (quantity * price);
            self.avg_price = total_cost / new_quantity.abs();
        }
        // Reduced without flipping keeps the entry price

        self.signed_quantity = new_quantity;
        realised
    }
}

/// Positions on both legs plus the delta invariant over them.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PositionState {
    pub spot: Position,
    pub futures: Position,
}

impl PositionState {
    /// Signed sum of the two positions - zero means perfectly hedged.
    pub fn delta(&self) -> Decimal {
        self.spot.signed_quantity + self.futures.signed_quantity
    }

    /// Gross exposure across both legs.
    pub fn gross_exposure(&self) -> Decimal {
        self.spot.signed_quantity.abs() + self.futures.signed_quantity.abs()
    }

    /// Delta imbalance as a percentage of gross exposure.
    pub fn imbalance_pct(&self) -> Decimal {
        let gross = self.gross_exposure();
        if gross.is_zero() {
            Decimal::ZERO
        } else {
            self.delta().abs() / gross * Decimal::ONE_HUNDRED
        }
    }

    pub fn has_positions(&self) -> bool {
        !self.spot.signed_quantity.is_zero() || !self.futures.signed_quantity.is_zero()
    }

    pub fn position(&self, role: VenueRole) -> Position {
        match role {
            VenueRole::Spot => self.spot,
            VenueRole::Futures => self.futures,
        }
    }

    pub fn position_mut(&mut self, role: VenueRole) -> &mut Position {
        match role {
            VenueRole::Spot => &mut self.spot,
            VenueRole::Futures => &mut self.futures,
        }
    }
}

/// Active orders per role, keyed by venue order id.
///
/// `BTreeMap` keeps serialized snapshots deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ActiveOrders {
    pub spot: BTreeMap<OrderId, Order>,
    pub futures: BTreeMap<OrderId, Order>,
}

impl ActiveOrders {
    pub fn count(&self) -> usize {
        self.spot.len() + self.futures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn role(&self, role: VenueRole) -> &BTreeMap<OrderId, Order> {
        match role {
            VenueRole::Spot => &self.spot,
            VenueRole::Futures => &self.futures,
        }
    }

    pub fn role_mut(&mut self, role: VenueRole) -> &mut BTreeMap<OrderId, Order> {
        match role {
            VenueRole::Spot => &mut self.spot,
            VenueRole::Futures => &mut self.futures,
        }
    }

    pub fn insert(&mut self, role: VenueRole, order: Order) {
        self.role_mut(role).insert(order.id.clone(), order);
    }

    pub fn remove(&mut self, role: VenueRole, id: &OrderId) -> Option<Order> {
        self.role_mut(role).remove(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (VenueRole, &Order)> {
        self.spot
            .values()
            .map(|order| (VenueRole::Spot, order))
            .chain(self.futures.values().map(|order| (VenueRole::Futures, order)))
    }
}

/// Number of retired order ids remembered to keep late replays of done orders idempotent.
pub const RETIRED_ORDER_CAPACITY: usize = 256;

/// Minimum quote notional per role, loaded from the venue symbol catalogs.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RoleMinimums {
    pub spot: Decimal,
    pub futures: Decimal,
}

impl RoleMinimums {
    pub fn get(&self, role: VenueRole) -> Decimal {
        match role {
            VenueRole::Spot => self.spot,
            VenueRole::Futures => self.futures,
        }
    }
}

/// Serializable state of one engine instance.
///
/// Owned exclusively by the engine loop - other components only observe it through
/// snapshots. Safe to serialize at any instant.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EngineContext {
    pub task_id: String,
    /// Traded pair. The spot leg trades `symbol` as spot, the futures leg as perpetual.
    pub symbol: Symbol,
    pub base_position_size_quote: Decimal,
    pub max_position_multiplier: Decimal,
    pub futures_leverage: Decimal,
    pub params: TradingParams,
    pub positions: PositionState,
    /// Orders awaiting terminal state - revalidated against the venues on recovery.
    pub active_orders: ActiveOrders,
    pub state: EngineState,
    pub current_opportunity: Option<ArbitrageOpportunity>,
    pub position_open_time: Option<DateTime<Utc>>,
    pub min_quote_quantity: RoleMinimums,
    /// Recently retired order ids - a done order is processed exactly once even if the
    /// venue replays its terminal update after a reconnect or restart.
    pub retired_orders: std::collections::VecDeque<OrderId>,
    // Performance counters
    pub arbitrage_cycles: u64,
    pub total_volume_quote: Decimal,
    pub total_profit_quote: Decimal,
    pub total_fees_quote: Decimal,
    pub orderbook_updates: u64,
    pub order_operations: u64,
}

impl EngineContext {
    pub fn new(
        task_id: String,
        symbol: Symbol,
        base_position_size_quote: Decimal,
        max_position_multiplier: Decimal,
        futures_leverage: Decimal,
        params: TradingParams,
    ) -> Self {
        Self {
            task_id,
            symbol,
            base_position_size_quote,
            max_position_multiplier,
            futures_leverage,
            params,
            positions: PositionState::default(),
            active_orders: ActiveOrders::default(),
            state: EngineState::Idle,
            current_opportunity: None,
            position_open_time: None,
            min_quote_quantity: RoleMinimums::default(),
            retired_orders: std::collections::VecDeque::new(),
            arbitrage_cycles: 0,
            total_volume_quote: Decimal::ZERO,
            total_profit_quote: Decimal::ZERO,
            total_fees_quote: Decimal::ZERO,
            orderbook_updates: 0,
            order_operations: 0,
        }
    }

    /// Maximum position size in base units at the provided price.
    pub fn max_position_quantity(&self, price: Decimal) -> Decimal {
        if price.is_zero() {
            return Decimal::ZERO;
        }
        self.base_position_size_quote * self.max_position_multiplier / price
    }

    /// Record an order id as retired, evicting the oldest beyond capacity.
    pub fn note_retired(&mut self, id: OrderId) {
        if self.retired_orders.contains(&id) {
            return;
        }
        self.retired_orders.push_back(id);
        if self.retired_orders.len() > RETIRED_ORDER_CAPACITY {
            self.retired_orders.pop_front();
        }
    }

    pub fn is_retired(&self, id: &OrderId) -> bool {
        self.retired_orders.contains(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_position_apply_fill_weighted_average() {
        let mut position = Position::default();

        position.apply_fill(Side::Buy, dec!(0.1), dec!(100));
        assert_eq!(position.signed_quantity, dec!(0.1));
        assert_eq!(position.avg_price, dec!(100));

        // Increase weights the average
        position.apply_fill(Side::Buy, dec!(0.1), dec!(102));
        assert_eq!(position.signed_quantity, dec!(0.2));
        assert_eq!(position.avg_price, dec!(101));

        // Reduction keeps the entry price
        position.apply_fill(Side::Sell, dec!(0.1), dec!(105));
        assert_eq!(position.signed_quantity, dec!(0.1));
        assert_eq!(position.avg_price, dec!(101));

        // Full close resets
        position.apply_fill(Side::Sell, dec!(0.1), dec!(105));
        assert_eq!(position.signed_quantity, dec!(0));
        assert_eq!(position.avg_price, dec!(0));
    }

    #[test]
    fn test_position_apply_fill_realised_pnl() {
        let mut position = Position::default();

        assert_eq!(position.apply_fill(Side::Buy, dec!(0.2), dec!(100.01)), dec!(0));
        // Selling 0.2 bought at 100.01 for 100.10 realises 0.018
        assert_eq!(
            position.apply_fill(Side::Sell, dec!(0.2), dec!(100.10)),
            dec!(0.018)
        );
        assert_eq!(position.signed_quantity, dec!(0));
    }

    #[test]
    fn test_position_flip_resets_entry_price() {
        let mut position = Position::default();
        position.apply_fill(Side::Buy, dec!(0.1), dec!(100));
        position.apply_fill(Side::Sell, dec!(0.3), dec!(98));

        assert_eq!(position.signed_quantity, dec!(-0.2));
        assert_eq!(position.avg_price, dec!(98));
    }

    #[test]
    fn test_position_state_delta_and_imbalance() {
        let mut positions = PositionState::default();
        positions.spot.apply_fill(Side::Buy, dec!(0.2), dec!(100.01));
        positions
            .futures
            .apply_fill(Side::Sell, dec!(0.15), dec!(100.15));

        assert_eq!(positions.delta(), dec!(0.05));
        assert_eq!(positions.gross_exposure(), dec!(0.35));
        // 0.05 / 0.35 * 100 > 14%
        assert!(positions.imbalance_pct() > dec!(14));

        positions
            .futures
            .apply_fill(Side::Sell, dec!(0.05), dec!(100.15));
        assert_eq!(positions.delta(), dec!(0));
        assert_eq!(positions.imbalance_pct(), dec!(0));
    }

    #[test]
    fn test_opportunity_freshness_boundary() {
        let now = Utc::now();
        let opportunity = ArbitrageOpportunity {
            direction: Direction::SpotToFutures,
            spread_pct: dec!(-0.14),
            buy_price: dec!(100.01),
            sell_price: dec!(100.15),
            max_quantity: dec!(0.2),
            time: now,
        };

        assert!(opportunity.is_fresh(now));
        assert!(opportunity.is_fresh(now + chrono::TimeDelta::milliseconds(4999)));
        // Exactly the maximum age is stale
        assert!(!opportunity.is_fresh(now + OPPORTUNITY_MAX_AGE));
    }

    #[test]
    fn test_context_snapshot_serde_round_trip() {
        let mut context = EngineContext::new(
            "arbitrage_btc_usdt_1".to_string(),
            Symbol::spot("btc", "usdt"),
            dec!(20),
            dec!(2),
            dec!(1),
            TradingParams::default(),
        );
        context.state = EngineState::Monitoring;
        context.positions.spot.apply_fill(Side::Buy, dec!(0.2), dec!(100.01));

        let json = serde_json::to_string(&context).unwrap();
        let restored = serde_json::from_str::<EngineContext>(&json).unwrap();
        assert_eq!(restored, context);
    }
}
