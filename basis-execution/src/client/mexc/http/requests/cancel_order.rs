use super::{RECV_WINDOW_MS, request_timestamp};
use crate::client::mexc::types::MexcOrderData;
use basis_integration::protocol::http::rest::RestRequest;
use serde::Serialize;
use std::{borrow::Cow, time::Duration};

/// Cancel a single order by venue id.
///
/// See docs: <https://mexcdevelop.github.io/apidocs/spot_v3_en/#cancel-order>
#[derive(Debug, Clone)]
pub struct CancelOrderRequest {
    query: CancelOrderQuery,
}

impl CancelOrderRequest {
    pub fn new(symbol: String, order_id: String) -> Self {
        Self {
            query: CancelOrderQuery {
                symbol,
                order_id,
                timestamp: request_timestamp(),
                recv_window: RECV_WINDOW_MS,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelOrderQuery {
    symbol: String,
    #[serde(rename = "orderId")]
    order_id: String,
    timestamp: u64,
    #[serde(rename = "recvWindow")]
    recv_window: u64,
}

impl RestRequest for CancelOrderRequest {
    type Response = MexcOrderData;
    type QueryParams = CancelOrderQuery;
    type Body = ();

    fn path(&self) -> Cow<'static, str> {
        Cow::Borrowed("/api/v3/order")
    }

    fn method() -> reqwest::Method {
        reqwest::Method::DELETE
    }

    fn query_params(&self) -> Option<&Self::QueryParams> {
        Some(&self.query)
    }

    fn timeout() -> Duration {
        Duration::from_secs(3)
    }
}

/// Cancel all open orders on a symbol.
///
/// See docs: <https://mexcdevelop.github.io/apidocs/spot_v3_en/#cancel-all-open-orders-on-a-symbol>
#[derive(Debug, Clone)]
pub struct CancelAllOrdersRequest {
    query: CancelAllOrdersQuery,
}

impl CancelAllOrdersRequest {
    pub fn new(symbol: String) -> Self {
        Self {
            query: CancelAllOrdersQuery {
                symbol,
                timestamp: request_timestamp(),
                recv_window: RECV_WINDOW_MS,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelAllOrdersQuery {
    symbol: String,
    timestamp: u64,
    #[serde(rename = "recvWindow")]
    recv_window: u64,
}

impl RestRequest for CancelAllOrdersRequest {
    type Response = Vec<MexcOrderData>;
    type QueryParams = CancelAllOrdersQuery;
    type Body = ();

    fn path(&self) -> Cow<'static, str> {
        Cow::Borrowed("/api/v3/openOrders")
    }

    fn method() -> reqwest::Method {
        reqwest::Method::DELETE
    }

    fn query_params(&self) -> Option<&Self::QueryParams> {
        Some(&self.query)
    }

    fn timeout() -> Duration {
        Duration::from_secs(3)
    }
}
