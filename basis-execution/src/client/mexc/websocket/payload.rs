use crate::{
    balance::{AssetBalance, Balance},
    order::{Order, OrderKind, OrderStatus, id::{ClientOrderId, OrderId}},
    trade::{Liquidity, Trade, TradeId},
};
use basis_instrument::{Side, symbol::Symbol};
use basis_integration::de::datetime_utc_from_epoch_duration;
use basis_instrument::asset::AssetNameExchange;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

/// Envelope wrapping every MEXC private stream payload.
///
/// ### Raw Payload Example
/// ```json
/// {
///     "c": "spot@private.orders.v3.api",
///     "s": "BTCUSDT",
///     "t": 1643817121000,
///     "d": { "i": "1", "S": 1, "o": 1, "p": "100.01", "v": "0.2", "cv": "0.05", "s": 3 }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct MexcPrivateMessage {
    #[serde(rename = "c")]
    pub channel: String,
    #[serde(rename = "s", default)]
    pub symbol: Option<String>,
    #[serde(rename = "t", default)]
    pub time: Option<u64>,
    #[serde(rename = "d")]
    pub data: MexcPrivateData,
}

/// Private payload variants, discriminated by the envelope channel.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MexcPrivateData {
    Order(MexcPrivateOrder),
    Deal(MexcPrivateDeal),
    Account(MexcPrivateAccount),
}

/// Order update pushed on `spot@private.orders.v3.api`.
#[derive(Debug, Clone, Deserialize)]
pub struct MexcPrivateOrder {
    /// Venue order id.
    #[serde(rename = "i")]
    pub order_id: String,
    /// Client order id, when one was sent.
    #[serde(rename = "c", default)]
    pub client_order_id: Option<String>,
    /// 1 = limit, 5 = market.
    #[serde(rename = "o")]
    pub order_kind: u8,
    /// 1 = buy, 2 = sell.
    #[serde(rename = "S")]
    pub side: u8,
    #[serde(rename = "p", with = "rust_decimal::serde::str")]
    pub price: Decimal,
    #[serde(rename = "v", with = "rust_decimal::serde::str")]
    pub quantity: Decimal,
    /// Cumulative filled quantity.
    #[serde(rename = "cv", with = "rust_decimal::serde::str", default)]
    pub cumulative_quantity: Decimal,
    /// 1 = new, 2 = filled, 3 = partially filled, 4 = cancelled, 5 = partially cancelled.
    #[serde(rename = "s")]
    pub status: u8,
}

/// Fill pushed on `spot@private.deals.v3.api`.
#[derive(Debug, Clone, Deserialize)]
pub struct MexcPrivateDeal {
    /// Trade id.
    #[serde(rename = "t")]
    pub trade_id: String,
    /// Venue order id the fill belongs to.
    #[serde(rename = "i")]
    pub order_id: String,
    #[serde(rename = "S")]
    pub side: u8,
    #[serde(rename = "p", with = "rust_decimal::serde::str")]
    pub price: Decimal,
    #[serde(rename = "v", with = "rust_decimal::serde::str")]
    pub quantity: Decimal,
    /// 1 when the fill added liquidity.
    #[serde(rename = "m", default)]
    pub is_maker: u8,
    #[serde(rename = "n", with = "rust_decimal::serde::str", default)]
    pub fee: Decimal,
}

/// Balance update pushed on `spot@private.account.v3.api`.
#[derive(Debug, Clone, Deserialize)]
pub struct MexcPrivateAccount {
    #[serde(rename = "a")]
    pub asset: String,
    /// Free amount.
    #[serde(rename = "f", with = "rust_decimal::serde::str")]
    pub free: Decimal,
    /// Locked amount.
    #[serde(rename = "l", with = "rust_decimal::serde::str")]
    pub locked: Decimal,
}

fn side_from_int(side: u8) -> Side {
    if side == 2 { Side::Sell } else { Side::Buy }
}

impl MexcPrivateOrder {
    pub fn into_order(self, symbol: Symbol, time_ms: Option<u64>) -> Order {
        Order {
            id: OrderId::new(&self.order_id),
            cid: self.client_order_id.map(ClientOrderId::new),
            symbol,
            side: side_from_int(self.side),
            kind: if self.order_kind == 5 {
                OrderKind::Market
            } else {
                OrderKind::Limit
            },
            price: self.price,
            quantity: self.quantity,
            filled_quantity: self.cumulative_quantity,
            status: match self.status {
                1 => OrderStatus::New,
                2 => OrderStatus::Filled,
                3 => OrderStatus::PartiallyFilled,
                4 => OrderStatus::Cancelled,
                5 => OrderStatus::PartiallyCancelled,
                _ => OrderStatus::Unknown,
            },
            time_exchange: time_ms
                .map(|ms| datetime_utc_from_epoch_duration(Duration::from_millis(ms)))
                .unwrap_or_else(chrono::Utc::now),
        }
    }
}

impl MexcPrivateDeal {
    pub fn into_trade(self, symbol: Symbol, time_ms: Option<u64>) -> Trade {
        Trade {
            id: TradeId::from(smol_str::SmolStr::new(&self.trade_id)),
            order_id: OrderId::new(&self.order_id),
            symbol,
            time_exchange: time_ms
                .map(|ms| datetime_utc_from_epoch_duration(Duration::from_millis(ms)))
                .unwrap_or_else(chrono::Utc::now),
            side: side_from_int(self.side),
            price: self.price,
            quantity: self.quantity,
            liquidity: if self.is_maker == 1 {
                Liquidity::Maker
            } else {
                Liquidity::Taker
            },
            fees: self.fee,
        }
    }
}

impl MexcPrivateAccount {
    pub fn into_balance(self) -> AssetBalance {
        AssetBalance::new(
            AssetNameExchange::new(self.asset),
            Balance::new(self.free + self.locked, self.free),
            chrono::Utc::now(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_de_private_order_message() {
        let input = r#"
        {
            "c": "spot@private.orders.v3.api",
            "s": "BTCUSDT",
            "t": 1643817121000,
            "d": { "i": "1", "c": "cid-1", "S": 1, "o": 1, "p": "100.01", "v": "0.2", "cv": "0.05", "s": 3 }
        }
        "#;

        let message = serde_json::from_str::<MexcPrivateMessage>(input).unwrap();
        let MexcPrivateData::Order(order) = message.data else {
            panic!("expected Order variant");
        };
        let order = order.into_order(Symbol::spot("btc", "usdt"), message.time);

        assert_eq!(order.status, OrderStatus::PartiallyFilled);
        assert_eq!(order.filled_quantity, dec!(0.05));
        assert_eq!(order.cid, Some(ClientOrderId::new("cid-1")));
    }

    #[test]
    fn test_de_private_account_message() {
        let input = r#"
        {
            "c": "spot@private.account.v3.api",
            "t": 1643817121000,
            "d": { "a": "USDT", "f": "100.5", "l": "20.0" }
        }
        "#;

        let message = serde_json::from_str::<MexcPrivateMessage>(input).unwrap();
        let MexcPrivateData::Account(account) = message.data else {
            panic!("expected Account variant");
        };
        let balance = account.into_balance();
        assert_eq!(balance.balance.total, dec!(120.5));
    }

    #[test]
    fn test_de_private_deal_message() {
        let input = r#"
        {
            "c": "spot@private.deals.v3.api",
            "s": "BTCUSDT",
            "t": 1643817121000,
            "d": { "t": "trade-1", "i": "1", "S": 2, "p": "100.10", "v": "0.05", "m": 1, "n": "0.002" }
        }
        "#;

        let message = serde_json::from_str::<MexcPrivateMessage>(input).unwrap();
        let MexcPrivateData::Deal(deal) = message.data else {
            panic!("expected Deal variant");
        };
        let trade = deal.into_trade(Symbol::spot("btc", "usdt"), message.time);
        assert_eq!(trade.side, Side::Sell);
        assert_eq!(trade.liquidity, Liquidity::Maker);
        assert_eq!(trade.fees, dec!(0.002));
    }
}
