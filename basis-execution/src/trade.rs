use crate::order::id::OrderId;
use basis_instrument::{Side, symbol::Symbol};
use chrono::{DateTime, Utc};
use derive_more::{Constructor, From};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt::{Display, Formatter};

#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, From, Constructor,
)]
pub struct TradeId(pub SmolStr);

/// Whether a fill added or removed liquidity - fee tiers differ.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Liquidity {
    Maker,
    Taker,
}

/// A fill of an [`Order`](crate::order::Order).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Constructor)]
pub struct Trade {
    pub id: TradeId,
    pub order_id: OrderId,
    pub symbol: Symbol,
    pub time_exchange: DateTime<Utc>,
    pub side: Side,
    pub price: Decimal,
    pub quantity: Decimal,
    pub liquidity: Liquidity,
    pub fees: Decimal,
}

impl Trade {
    /// Quote value of the fill.
    pub fn value_quote(&self) -> Decimal {
        self.price * self.quantity.abs()
    }
}

impl Display for Trade {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ symbol: {}, side: {}, price: {}, quantity: {}, time: {} }}",
            self.symbol, self.side, self.price, self.quantity, self.time_exchange
        )
    }
}
