use self::id::{ClientOrderId, OrderId};
use basis_instrument::{Side, symbol::Symbol};
use chrono::{DateTime, Utc};
use derive_more::{Constructor, Display};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// `Order` related identifiers.
pub mod id;

/// Order open request types.
pub mod request;

/// Venue order - intent plus its latest observed state.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Constructor)]
pub struct Order {
    /// Venue-assigned identifier.
    pub id: OrderId,
    /// Client-assigned identifier, if one was sent.
    pub cid: Option<ClientOrderId>,
    pub symbol: Symbol,
    pub side: Side,
    pub kind: OrderKind,
    pub price: Decimal,
    pub quantity: Decimal,
    pub filled_quantity: Decimal,
    pub status: OrderStatus,
    pub time_exchange: DateTime<Utc>,
}

impl Order {
    /// An order is done once the venue will never mutate it again.
    pub fn is_done(&self) -> bool {
        self.status.is_done()
    }

    /// Requested quantity not yet filled.
    pub fn quantity_remaining(&self) -> Decimal {
        self.quantity - self.filled_quantity
    }

    /// Signed fill quantity - positive for buys, negative for sells.
    pub fn signed_filled_quantity(&self) -> Decimal {
        match self.side {
            Side::Buy => self.filled_quantity,
            Side::Sell => -self.filled_quantity,
        }
    }
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
pub enum OrderKind {
    Market,
    Limit,
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
pub enum TimeInForce {
    GoodUntilCancelled,
    ImmediateOrCancel,
}

/// Venue order lifecycle status.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Cancelled,
    PartiallyCancelled,
    Rejected,
    Expired,
    Unknown,
}

impl OrderStatus {
    /// Statuses the venue will never move an order out of.
    pub fn is_done(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled
                | OrderStatus::Cancelled
                | OrderStatus::PartiallyCancelled
                | OrderStatus::Rejected
                | OrderStatus::Expired
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    pub(crate) fn order(status: OrderStatus, filled: Decimal) -> Order {
        Order {
            id: OrderId::new("1"),
            cid: None,
            symbol: Symbol::spot("btc", "usdt"),
            side: Side::Buy,
            kind: OrderKind::Limit,
            price: dec!(100.01),
            quantity: dec!(0.2),
            filled_quantity: filled,
            status,
            time_exchange: Utc::now(),
        }
    }

    #[test]
    fn test_order_status_is_done() {
        struct TestCase {
            input: OrderStatus,
            expected: bool,
        }

        let tests = vec![
            TestCase {
                // TC0: New is active
                input: OrderStatus::New,
                expected: false,
            },
            TestCase {
                // TC1: PartiallyFilled is active
                input: OrderStatus::PartiallyFilled,
                expected: false,
            },
            TestCase {
                // TC2: Filled is done
                input: OrderStatus::Filled,
                expected: true,
            },
            TestCase {
                // TC3: Cancelled is done
                input: OrderStatus::Cancelled,
                expected: true,
            },
            TestCase {
                // TC4: PartiallyCancelled is done
                input: OrderStatus::PartiallyCancelled,
                expected: true,
            },
            TestCase {
                // TC5: Rejected is done
                input: OrderStatus::Rejected,
                expected: true,
            },
            TestCase {
                // TC6: Expired is done
                input: OrderStatus::Expired,
                expected: true,
            },
            TestCase {
                // TC7: Unknown is treated as active until the venue clarifies
                input: OrderStatus::Unknown,
                expected: false,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            assert_eq!(test.input.is_done(), test.expected, "TC{index} failed");
        }
    }

    #[test]
    fn test_signed_filled_quantity() {
        let mut buy = order(OrderStatus::PartiallyFilled, dec!(0.15));
        assert_eq!(buy.signed_filled_quantity(), dec!(0.15));

        buy.side = Side::Sell;
        assert_eq!(buy.signed_filled_quantity(), dec!(-0.15));
    }

    #[test]
    fn test_quantity_remaining() {
        let order = order(OrderStatus::PartiallyFilled, dec!(0.15));
        assert_eq!(order.quantity_remaining(), dec!(0.05));
    }
}
