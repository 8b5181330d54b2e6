use basis_instrument::asset::AssetNameExchange;
use chrono::{DateTime, Utc};
use derive_more::Constructor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Balance of one asset on one venue at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Constructor)]
pub struct AssetBalance {
    pub asset: AssetNameExchange,
    pub balance: Balance,
    pub time_exchange: DateTime<Utc>,
}

/// Free and total amounts of an asset.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Deserialize, Serialize, Constructor)]
pub struct Balance {
    pub total: Decimal,
    pub free: Decimal,
}

impl Balance {
    /// Amount locked by open orders or positions.
    pub fn used(&self) -> Decimal {
        self.total - self.free
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_balance_used() {
        let balance = Balance::new(dec!(10), dec!(7.5));
        assert_eq!(balance.used(), dec!(2.5));
    }
}
