use crate::{
    balance::{AssetBalance, Balance},
    order::{Order, id::OrderId},
};
use basis_instrument::{asset::AssetNameExchange, symbol::Symbol};
use chrono::Utc;
use fnv::FnvHashMap;
use std::collections::VecDeque;

/// Number of done orders retained per symbol.
///
/// Done orders are immutable, so this history is safe to cache and serve without consulting
/// the venue.
pub const DEFAULT_EXECUTED_ORDER_CAPACITY: usize = 1000;

/// Order bookkeeping for one venue account.
///
/// Maintains two views keyed by symbol then order id:
/// - `open`: all not-done orders.
/// - `executed`: done orders, retained as a bounded FIFO per symbol.
///
/// [`AccountOrders::update_order`] keeps the views disjoint: an order id lives in exactly one
/// of them, and moves from `open` to `executed` exactly once.
#[derive(Debug)]
pub struct AccountOrders {
    open: FnvHashMap<Symbol, FnvHashMap<OrderId, Order>>,
    executed: FnvHashMap<Symbol, ExecutedOrders>,
    executed_capacity: usize,
}

#[derive(Debug, Default)]
struct ExecutedOrders {
    orders: FnvHashMap<OrderId, Order>,
    eviction_queue: VecDeque<OrderId>,
}

impl Default for AccountOrders {
    fn default() -> Self {
        Self::new(DEFAULT_EXECUTED_ORDER_CAPACITY)
    }
}

impl AccountOrders {
    pub fn new(executed_capacity: usize) -> Self {
        Self {
            open: FnvHashMap::default(),
            executed: FnvHashMap::default(),
            executed_capacity,
        }
    }

    /// Process an inbound order update. Idempotent and total:
    /// 1. Done orders are removed from `open` (if present) and inserted into `executed`,
    ///    evicting the oldest history entry if the symbol is at capacity.
    /// 2. Any other order is upserted into `open`.
    pub fn update_order(&mut self, order: Order) {
        if order.is_done() {
            if let Some(open) = self.open.get_mut(&order.symbol) {
                open.remove(&order.id);
            }

            let executed = self.executed.entry(order.symbol.clone()).or_default();
            if executed.orders.insert(order.id.clone(), order.clone()).is_none() {
                executed.eviction_queue.push_back(order.id);
                if executed.eviction_queue.len() > self.executed_capacity {
                    if let Some(evicted) = executed.eviction_queue.pop_front() {
                        executed.orders.remove(&evicted);
                    }
                }
            }
        } else {
            self.open
                .entry(order.symbol.clone())
                .or_default()
                .insert(order.id.clone(), order);
        }
    }

    /// Find an order in the open map.
    pub fn open_order(&self, symbol: &Symbol, id: &OrderId) -> Option<&Order> {
        self.open.get(symbol).and_then(|orders| orders.get(id))
    }

    /// Find an order in the executed history.
    pub fn executed_order(&self, symbol: &Symbol, id: &OrderId) -> Option<&Order> {
        self.executed
            .get(symbol)
            .and_then(|executed| executed.orders.get(id))
    }

    /// All open orders, optionally filtered by symbol.
    pub fn open_orders(&self, symbol: Option<&Symbol>) -> Vec<Order> {
        match symbol {
            Some(symbol) => self
                .open
                .get(symbol)
                .map(|orders| orders.values().cloned().collect())
                .unwrap_or_default(),
            None => self
                .open
                .values()
                .flat_map(|orders| orders.values().cloned())
                .collect(),
        }
    }

    /// Replace the open set for a symbol with the venue-authoritative view.
    ///
    /// Orders previously tracked as open but absent from the venue view are dropped - the
    /// venue no longer recognises them.
    pub fn reconcile_open_orders(&mut self, symbol: &Symbol, venue_orders: Vec<Order>) {
        let open = self.open.entry(symbol.clone()).or_default();
        open.clear();
        for order in venue_orders {
            if !order.is_done() {
                open.insert(order.id.clone(), order);
            }
        }
    }
}

/// Balance bookkeeping for one venue account.
///
/// Balances are only mutated by streaming private events or an explicit refresh - never
/// inferred.
#[derive(Debug, Default)]
pub struct AccountBalances {
    balances: FnvHashMap<AssetNameExchange, AssetBalance>,
}

impl AccountBalances {
    pub fn update(&mut self, balance: AssetBalance) {
        self.balances.insert(balance.asset.clone(), balance);
    }

    pub fn replace_all(&mut self, balances: Vec<AssetBalance>) {
        self.balances.clear();
        for balance in balances {
            self.update(balance);
        }
    }

    /// Return the balance for the provided asset.
    ///
    /// Unknown assets yield a zero placeholder rather than a stale reading.
    pub fn balance(&self, asset: &AssetNameExchange) -> AssetBalance {
        self.balances.get(asset).cloned().unwrap_or_else(|| {
            AssetBalance::new(asset.clone(), Balance::default(), Utc::now())
        })
    }

    pub fn all(&self) -> Vec<AssetBalance> {
        self.balances.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{OrderKind, OrderStatus, id::OrderId};
    use basis_instrument::Side;
    use rust_decimal_macros::dec;

    fn order(id: &str, status: OrderStatus) -> Order {
        Order {
            id: OrderId::new(id),
            cid: None,
            symbol: Symbol::spot("btc", "usdt"),
            side: Side::Buy,
            kind: OrderKind::Limit,
            price: dec!(100.01),
            quantity: dec!(0.2),
            filled_quantity: dec!(0),
            status,
            time_exchange: Utc::now(),
        }
    }

    #[test]
    fn test_update_order_open_then_done() {
        let mut orders = AccountOrders::default();
        let symbol = Symbol::spot("btc", "usdt");

        // Not-done upserts into open
        orders.update_order(order("1", OrderStatus::New));
        assert!(orders.open_order(&symbol, &OrderId::new("1")).is_some());
        assert!(orders.executed_order(&symbol, &OrderId::new("1")).is_none());

        // Update mutates in place
        orders.update_order(order("1", OrderStatus::PartiallyFilled));
        assert_eq!(
            orders
                .open_order(&symbol, &OrderId::new("1"))
                .unwrap()
                .status,
            OrderStatus::PartiallyFilled
        );

        // Done retires to executed exactly once - never in both sets
        orders.update_order(order("1", OrderStatus::Filled));
        assert!(orders.open_order(&symbol, &OrderId::new("1")).is_none());
        assert!(orders.executed_order(&symbol, &OrderId::new("1")).is_some());
    }

    #[test]
    fn test_update_order_done_is_idempotent() {
        let mut orders = AccountOrders::default();
        let symbol = Symbol::spot("btc", "usdt");

        orders.update_order(order("1", OrderStatus::Filled));
        orders.update_order(order("1", OrderStatus::Filled));

        assert!(orders.open_order(&symbol, &OrderId::new("1")).is_none());
        assert!(orders.executed_order(&symbol, &OrderId::new("1")).is_some());
        assert_eq!(
            orders.executed.get(&symbol).unwrap().eviction_queue.len(),
            1
        );
    }

    #[test]
    fn test_update_order_xor_invariant_over_random_sequence() {
        // For every processed update: the order is in open XOR executed, and
        // executed implies done
        let mut orders = AccountOrders::default();
        let symbol = Symbol::spot("btc", "usdt");

        let statuses = [
            OrderStatus::New,
            OrderStatus::PartiallyFilled,
            OrderStatus::Filled,
            OrderStatus::New,
            OrderStatus::Cancelled,
            OrderStatus::Rejected,
            OrderStatus::PartiallyFilled,
            OrderStatus::Expired,
        ];

        for (sequence, status) in statuses.into_iter().enumerate() {
            let id = format!("order_{}", sequence % 3);
            orders.update_order(order(&id, status));

            let id = OrderId::new(&id);
            let in_open = orders.open_order(&symbol, &id).is_some();
            let in_executed = orders.executed_order(&symbol, &id).is_some();
            assert!(in_open ^ in_executed, "update {sequence} violated XOR");

            if let Some(executed) = orders.executed_order(&symbol, &id) {
                assert!(executed.is_done(), "executed set held a not-done order");
            }
        }
    }

    #[test]
    fn test_executed_orders_evict_beyond_capacity() {
        let mut orders = AccountOrders::new(2);
        let symbol = Symbol::spot("btc", "usdt");

        orders.update_order(order("1", OrderStatus::Filled));
        orders.update_order(order("2", OrderStatus::Filled));
        orders.update_order(order("3", OrderStatus::Filled));

        assert!(orders.executed_order(&symbol, &OrderId::new("1")).is_none());
        assert!(orders.executed_order(&symbol, &OrderId::new("2")).is_some());
        assert!(orders.executed_order(&symbol, &OrderId::new("3")).is_some());
    }

    #[test]
    fn test_reconcile_open_orders_drops_unknown() {
        let mut orders = AccountOrders::default();
        let symbol = Symbol::spot("btc", "usdt");

        orders.update_order(order("stale", OrderStatus::New));
        orders.reconcile_open_orders(&symbol, vec![order("live", OrderStatus::New)]);

        assert!(orders.open_order(&symbol, &OrderId::new("stale")).is_none());
        assert!(orders.open_order(&symbol, &OrderId::new("live")).is_some());
    }

    #[test]
    fn test_balances_unknown_asset_zero_placeholder() {
        let balances = AccountBalances::default();
        let unknown = balances.balance(&AssetNameExchange::new("DOGE"));
        assert_eq!(unknown.balance, Balance::default());
    }
}
