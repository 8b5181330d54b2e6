use crate::order::{Order, OrderKind, OrderStatus, id::{ClientOrderId, OrderId}};
use basis_instrument::{Side, symbol::Symbol};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Gate.io futures order payload, shared by REST endpoints and the `futures.orders` push
/// channel.
///
/// Sizes are signed contract counts - positive opens long / buys, negative opens short /
/// sells. `left` carries the unfilled remainder with the same sign.
///
/// ### Raw Payload Example
/// ```json
/// {
///     "id": 123456789,
///     "contract": "BTC_USDT",
///     "size": 2000,
///     "left": 500,
///     "price": "100.01",
///     "tif": "gtc",
///     "text": "t-basis-a1b2c3",
///     "status": "open",
///     "finish_as": null,
///     "create_time": 1643817120.123
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct GateioFuturesOrder {
    pub id: u64,
    pub contract: String,
    pub size: i64,
    pub left: i64,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    #[serde(default)]
    pub tif: Option<String>,
    /// Client-supplied order text - Gate.io requires a `t-` prefix.
    #[serde(default)]
    pub text: Option<String>,
    pub status: GateioOrderStatus,
    #[serde(default)]
    pub finish_as: Option<String>,
    #[serde(default)]
    pub create_time: Option<f64>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateioOrderStatus {
    Open,
    Finished,
}

impl GateioFuturesOrder {
    /// Normalise into an ecosystem [`Order`], converting contract counts into base
    /// quantities with the provided contract size.
    pub fn into_order(self, symbol: Symbol, contract_size: Decimal) -> Order {
        let side = if self.size >= 0 { Side::Buy } else { Side::Sell };
        let quantity = Decimal::from(self.size.unsigned_abs()) * contract_size;
        let left = Decimal::from(self.left.unsigned_abs()) * contract_size;
        let filled_quantity = quantity - left;

        let status = match (self.status, self.finish_as.as_deref()) {
            (GateioOrderStatus::Open, _) if filled_quantity.is_zero() => OrderStatus::New,
            (GateioOrderStatus::Open, _) => OrderStatus::PartiallyFilled,
            (GateioOrderStatus::Finished, Some("filled")) => OrderStatus::Filled,
            (GateioOrderStatus::Finished, Some("cancelled")) if !filled_quantity.is_zero() => {
                OrderStatus::PartiallyCancelled
            }
            (GateioOrderStatus::Finished, Some("cancelled")) => OrderStatus::Cancelled,
            (GateioOrderStatus::Finished, Some("ioc")) => OrderStatus::Expired,
            (GateioOrderStatus::Finished, Some(_)) => OrderStatus::Cancelled,
            (GateioOrderStatus::Finished, None) => OrderStatus::Unknown,
        };

        Order {
            id: OrderId::new(self.id.to_string()),
            cid: self
                .text
                .as_deref()
                .and_then(|text| text.strip_prefix("t-"))
                .map(ClientOrderId::new),
            symbol,
            side,
            kind: if self.tif.as_deref() == Some("ioc") && self.price.is_zero() {
                OrderKind::Market
            } else {
                OrderKind::Limit
            },
            price: self.price,
            quantity,
            filled_quantity,
            status,
            time_exchange: self
                .create_time
                .and_then(|seconds| {
                    chrono::DateTime::from_timestamp_millis((seconds * 1000.0) as i64)
                })
                .unwrap_or_else(chrono::Utc::now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn order(size: i64, left: i64, status: GateioOrderStatus, finish_as: Option<&str>) -> GateioFuturesOrder {
        GateioFuturesOrder {
            id: 123456789,
            contract: "BTC_USDT".to_string(),
            size,
            left,
            price: dec!(100.01),
            tif: Some("gtc".to_string()),
            text: Some("t-basis-a1b2c3".to_string()),
            status,
            finish_as: finish_as.map(String::from),
            create_time: Some(1643817120.123),
        }
    }

    #[test]
    fn test_into_order_contract_conversion() {
        struct TestCase {
            input: GateioFuturesOrder,
            expected_side: Side,
            expected_quantity: Decimal,
            expected_filled: Decimal,
            expected_status: OrderStatus,
        }

        let contract_size = dec!(0.0001);

        let tests = vec![
            TestCase {
                // TC0: resting long with partial fill
                input: order(2000, 500, GateioOrderStatus::Open, None),
                expected_side: Side::Buy,
                expected_quantity: dec!(0.2),
                expected_filled: dec!(0.15),
                expected_status: OrderStatus::PartiallyFilled,
            },
            TestCase {
                // TC1: fresh short
                input: order(-2000, -2000, GateioOrderStatus::Open, None),
                expected_side: Side::Sell,
                expected_quantity: dec!(0.2),
                expected_filled: dec!(0),
                expected_status: OrderStatus::New,
            },
            TestCase {
                // TC2: fully filled
                input: order(-2000, 0, GateioOrderStatus::Finished, Some("filled")),
                expected_side: Side::Sell,
                expected_quantity: dec!(0.2),
                expected_filled: dec!(0.2),
                expected_status: OrderStatus::Filled,
            },
            TestCase {
                // TC3: cancelled after a partial fill
                input: order(2000, 500, GateioOrderStatus::Finished, Some("cancelled")),
                expected_side: Side::Buy,
                expected_quantity: dec!(0.2),
                expected_filled: dec!(0.15),
                expected_status: OrderStatus::PartiallyCancelled,
            },
            TestCase {
                // TC4: untouched cancel
                input: order(2000, 2000, GateioOrderStatus::Finished, Some("cancelled")),
                expected_side: Side::Buy,
                expected_quantity: dec!(0.2),
                expected_filled: dec!(0),
                expected_status: OrderStatus::Cancelled,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = test
                .input
                .into_order(Symbol::perpetual("btc", "usdt"), contract_size);
            assert_eq!(actual.side, test.expected_side, "TC{index} side failed");
            assert_eq!(
                actual.quantity, test.expected_quantity,
                "TC{index} quantity failed"
            );
            assert_eq!(
                actual.filled_quantity, test.expected_filled,
                "TC{index} filled failed"
            );
            assert_eq!(actual.status, test.expected_status, "TC{index} status failed");
        }
    }

    #[test]
    fn test_into_order_strips_client_id_prefix() {
        let actual = order(100, 100, GateioOrderStatus::Open, None)
            .into_order(Symbol::perpetual("btc", "usdt"), dec!(0.0001));
        assert_eq!(actual.cid, Some(ClientOrderId::new("basis-a1b2c3")));
    }
}
