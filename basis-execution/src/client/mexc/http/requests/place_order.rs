use super::{RECV_WINDOW_MS, request_timestamp};
use crate::{
    client::mexc::types::{MexcOrderData, MexcOrderSide},
    order::{OrderKind, request::OrderRequestOpen},
};
use basis_instrument::exchange::ExchangeId;
use rust_decimal::Decimal;
use basis_integration::protocol::http::rest::RestRequest;
use serde::Serialize;
use std::{borrow::Cow, time::Duration};

/// Place a new spot order.
///
/// See docs: <https://mexcdevelop.github.io/apidocs/spot_v3_en/#new-order>
#[derive(Debug, Clone)]
pub struct PlaceOrderRequest {
    query: PlaceOrderQuery,
}

impl PlaceOrderRequest {
    pub fn new(request: &OrderRequestOpen) -> Self {
        Self {
            query: PlaceOrderQuery {
                symbol: request.symbol.market_name(ExchangeId::MexcSpot).to_string(),
                side: request.side.into(),
                kind: match request.kind {
                    OrderKind::Limit => "LIMIT",
                    OrderKind::Market => "MARKET",
                },
                quantity: request.quantity,
                price: matches!(request.kind, OrderKind::Limit).then_some(request.price),
                new_client_order_id: request.cid.0.to_string(),
                timestamp: request_timestamp(),
                recv_window: RECV_WINDOW_MS,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaceOrderQuery {
    symbol: String,
    side: MexcOrderSide,
    #[serde(rename = "type")]
    kind: &'static str,
    quantity: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    price: Option<Decimal>,
    #[serde(rename = "newClientOrderId")]
    new_client_order_id: String,
    timestamp: u64,
    #[serde(rename = "recvWindow")]
    recv_window: u64,
}

impl RestRequest for PlaceOrderRequest {
    type Response = MexcOrderData;
    type QueryParams = PlaceOrderQuery;
    type Body = ();

    fn path(&self) -> Cow<'static, str> {
        Cow::Borrowed("/api/v3/order")
    }

    fn method() -> reqwest::Method {
        reqwest::Method::POST
    }

    fn query_params(&self) -> Option<&Self::QueryParams> {
        Some(&self.query)
    }

    /// Order placement is latency critical and never retried blindly.
    fn timeout() -> Duration {
        Duration::from_secs(3)
    }
}
