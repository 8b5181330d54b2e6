use super::{OrderKind, TimeInForce, id::ClientOrderId};
use basis_instrument::{Side, symbol::Symbol};
use derive_more::Constructor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Request to open an order on a venue.
///
/// Quantities and prices are expected to be pre-rounded against the venue
/// [`SymbolSpec`](basis_instrument::spec::SymbolSpec) before construction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Constructor)]
pub struct OrderRequestOpen {
    pub cid: ClientOrderId,
    pub symbol: Symbol,
    pub side: Side,
    pub kind: OrderKind,
    pub time_in_force: TimeInForce,
    pub price: Decimal,
    pub quantity: Decimal,
}

impl OrderRequestOpen {
    /// Construct a limit order request with a random [`ClientOrderId`].
    pub fn limit(symbol: Symbol, side: Side, price: Decimal, quantity: Decimal) -> Self {
        Self {
            cid: ClientOrderId::random(),
            symbol,
            side,
            kind: OrderKind::Limit,
            time_in_force: TimeInForce::GoodUntilCancelled,
            price,
            quantity,
        }
    }

    /// Construct a market order request with a random [`ClientOrderId`].
    ///
    /// The price carries the expected execution level for bookkeeping - venues ignore it.
    pub fn market(symbol: Symbol, side: Side, price: Decimal, quantity: Decimal) -> Self {
        Self {
            cid: ClientOrderId::random(),
            symbol,
            side,
            kind: OrderKind::Market,
            time_in_force: TimeInForce::ImmediateOrCancel,
            price,
            quantity,
        }
    }
}
