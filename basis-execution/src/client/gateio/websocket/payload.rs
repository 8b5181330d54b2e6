use crate::{
    balance::{AssetBalance, Balance},
    order::id::OrderId,
    trade::{Liquidity, Trade, TradeId},
};
use basis_instrument::{Side, asset::AssetNameExchange, symbol::Symbol};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Envelope wrapping every Gate.io futures private push.
///
/// The `channel` discriminates the `result` payload shape.
#[derive(Debug, Clone, Deserialize)]
pub struct GateioPrivateMessage {
    pub channel: String,
    pub event: String,
    #[serde(default)]
    pub result: serde_json::Value,
}

/// Fill pushed on `futures.usertrades`.
///
/// ### Raw Payload Example
/// ```json
/// {
///     "id": "trade-1",
///     "order_id": "123456789",
///     "contract": "BTC_USDT",
///     "create_time_ms": 1643817121000,
///     "price": "100.10",
///     "size": -500,
///     "role": "taker",
///     "fee": "0.002"
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct GateioUserTrade {
    pub id: String,
    pub order_id: String,
    pub contract: String,
    #[serde(default)]
    pub create_time_ms: Option<u64>,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    pub size: i64,
    pub role: String,
    #[serde(with = "rust_decimal::serde::str", default)]
    pub fee: Decimal,
}

impl GateioUserTrade {
    pub fn into_trade(self, symbol: Symbol, contract_size: Decimal) -> Trade {
        Trade {
            id: TradeId::from(smol_str::SmolStr::new(&self.id)),
            order_id: OrderId::new(self.order_id),
            symbol,
            time_exchange: self
                .create_time_ms
                .and_then(|ms| chrono::DateTime::from_timestamp_millis(ms as i64))
                .unwrap_or_else(chrono::Utc::now),
            side: if self.size >= 0 { Side::Buy } else { Side::Sell },
            price: self.price,
            quantity: Decimal::from(self.size.unsigned_abs()) * contract_size,
            liquidity: if self.role == "maker" {
                Liquidity::Maker
            } else {
                Liquidity::Taker
            },
            fees: self.fee,
        }
    }
}

/// Settle-currency balance pushed on `futures.balances`.
///
/// The push carries the post-change balance only; available margin is reconciled via REST
/// when an exact reading is required.
///
/// ### Raw Payload Example
/// ```json
/// { "balance": 120.5, "change": -0.01, "text": "BTC_USDT:123456789", "type": "fee" }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct GateioBalancePush {
    pub balance: f64,
}

impl GateioBalancePush {
    pub fn into_balance(self, settle_asset: AssetNameExchange) -> Option<AssetBalance> {
        let total = Decimal::try_from(self.balance).ok()?;
        Some(AssetBalance::new(
            settle_asset,
            Balance::new(total, total),
            chrono::Utc::now(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_de_user_trade_and_conversion() {
        let input = r#"
        {
            "id": "trade-1",
            "order_id": "123456789",
            "contract": "BTC_USDT",
            "create_time_ms": 1643817121000,
            "price": "100.10",
            "size": -500,
            "role": "taker",
            "fee": "0.002"
        }
        "#;

        let trade = serde_json::from_str::<GateioUserTrade>(input)
            .unwrap()
            .into_trade(Symbol::perpetual("btc", "usdt"), dec!(0.0001));

        assert_eq!(trade.side, Side::Sell);
        assert_eq!(trade.quantity, dec!(0.05));
        assert_eq!(trade.liquidity, Liquidity::Taker);
        assert_eq!(trade.time_exchange.timestamp_millis(), 1643817121000);
    }
}
