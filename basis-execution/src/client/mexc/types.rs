use crate::order::{Order, OrderKind, OrderStatus, id::{ClientOrderId, OrderId}};
use basis_instrument::{Side, symbol::Symbol};
use basis_integration::de::datetime_utc_from_epoch_duration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// MEXC REST order payload, shared by place/cancel/query/open-orders endpoints.
///
/// ### Raw Payload Example
/// ```json
/// {
///     "symbol": "BTCUSDT",
///     "orderId": "C02__443776347957968896",
///     "clientOrderId": "basis-a1b2c3",
///     "price": "100.01",
///     "origQty": "0.2",
///     "executedQty": "0.05",
///     "status": "PARTIALLY_FILLED",
///     "type": "LIMIT",
///     "side": "BUY",
///     "updateTime": 1643817121000
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct MexcOrderData {
    pub symbol: String,
    #[serde(rename = "orderId")]
    pub order_id: String,
    #[serde(rename = "clientOrderId", default)]
    pub client_order_id: Option<String>,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    #[serde(rename = "origQty", with = "rust_decimal::serde::str")]
    pub orig_qty: Decimal,
    #[serde(rename = "executedQty", with = "rust_decimal::serde::str", default)]
    pub executed_qty: Decimal,
    #[serde(default)]
    pub status: Option<MexcOrderStatus>,
    #[serde(rename = "type")]
    pub kind: MexcOrderKind,
    pub side: MexcOrderSide,
    #[serde(rename = "updateTime", alias = "transactTime", alias = "time", default)]
    pub update_time: Option<u64>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub enum MexcOrderStatus {
    #[serde(rename = "NEW")]
    New,
    #[serde(rename = "PARTIALLY_FILLED")]
    PartiallyFilled,
    #[serde(rename = "FILLED")]
    Filled,
    #[serde(rename = "CANCELED")]
    Cancelled,
    #[serde(rename = "PARTIALLY_CANCELED")]
    PartiallyCancelled,
    #[serde(rename = "REJECTED")]
    Rejected,
    #[serde(rename = "EXPIRED")]
    Expired,
}

impl From<MexcOrderStatus> for OrderStatus {
    fn from(status: MexcOrderStatus) -> Self {
        match status {
            MexcOrderStatus::New => OrderStatus::New,
            MexcOrderStatus::PartiallyFilled => OrderStatus::PartiallyFilled,
            MexcOrderStatus::Filled => OrderStatus::Filled,
            MexcOrderStatus::Cancelled => OrderStatus::Cancelled,
            MexcOrderStatus::PartiallyCancelled => OrderStatus::PartiallyCancelled,
            MexcOrderStatus::Rejected => OrderStatus::Rejected,
            MexcOrderStatus::Expired => OrderStatus::Expired,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub enum MexcOrderKind {
    #[serde(rename = "LIMIT")]
    Limit,
    #[serde(rename = "MARKET")]
    Market,
    #[serde(rename = "LIMIT_MAKER")]
    LimitMaker,
    #[serde(rename = "IMMEDIATE_OR_CANCEL")]
    ImmediateOrCancel,
    #[serde(rename = "FILL_OR_KILL")]
    FillOrKill,
}

impl From<MexcOrderKind> for OrderKind {
    fn from(kind: MexcOrderKind) -> Self {
        match kind {
            MexcOrderKind::Market => OrderKind::Market,
            _ => OrderKind::Limit,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub enum MexcOrderSide {
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "SELL")]
    Sell,
}

impl From<MexcOrderSide> for Side {
    fn from(side: MexcOrderSide) -> Self {
        match side {
            MexcOrderSide::Buy => Side::Buy,
            MexcOrderSide::Sell => Side::Sell,
        }
    }
}

impl From<Side> for MexcOrderSide {
    fn from(side: Side) -> Self {
        match side {
            Side::Buy => MexcOrderSide::Buy,
            Side::Sell => MexcOrderSide::Sell,
        }
    }
}

impl MexcOrderData {
    /// Normalise into an ecosystem [`Order`] for the provided [`Symbol`].
    ///
    /// Endpoints that omit `status` (eg/ place order acks) yield
    /// [`OrderStatus::New`].
    pub fn into_order(self, symbol: Symbol) -> Order {
        Order {
            id: OrderId::new(&self.order_id),
            cid: self.client_order_id.map(ClientOrderId::new),
            symbol,
            side: self.side.into(),
            kind: self.kind.into(),
            price: self.price,
            quantity: self.orig_qty,
            filled_quantity: self.executed_qty,
            status: self.status.map(OrderStatus::from).unwrap_or(OrderStatus::New),
            time_exchange: self
                .update_time
                .map(|ms| datetime_utc_from_epoch_duration(Duration::from_millis(ms)))
                .unwrap_or_else(chrono::Utc::now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_de_mexc_order_data() {
        let input = r#"
        {
            "symbol": "BTCUSDT",
            "orderId": "C02__443776347957968896",
            "clientOrderId": "basis-a1b2c3",
            "price": "100.01",
            "origQty": "0.2",
            "executedQty": "0.05",
            "status": "PARTIALLY_FILLED",
            "type": "LIMIT",
            "side": "BUY",
            "updateTime": 1643817121000
        }
        "#;

        let data = serde_json::from_str::<MexcOrderData>(input).unwrap();
        let order = data.into_order(Symbol::spot("btc", "usdt"));

        assert_eq!(order.id, OrderId::new("C02__443776347957968896"));
        assert_eq!(order.status, OrderStatus::PartiallyFilled);
        assert_eq!(order.price, dec!(100.01));
        assert_eq!(order.quantity, dec!(0.2));
        assert_eq!(order.filled_quantity, dec!(0.05));
        assert_eq!(order.side, Side::Buy);
        assert_eq!(order.time_exchange.timestamp_millis(), 1643817121000);
    }

    #[test]
    fn test_place_order_ack_without_status_is_new() {
        let input = r#"
        {
            "symbol": "BTCUSDT",
            "orderId": "1",
            "price": "100.01",
            "origQty": "0.2",
            "type": "LIMIT",
            "side": "SELL",
            "transactTime": 1643817120000
        }
        "#;

        let order = serde_json::from_str::<MexcOrderData>(input)
            .unwrap()
            .into_order(Symbol::spot("btc", "usdt"));
        assert_eq!(order.status, OrderStatus::New);
        assert_eq!(order.filled_quantity, dec!(0));
        assert_eq!(order.side, Side::Sell);
    }
}
