use super::{RECV_WINDOW_MS, request_timestamp};
use crate::client::mexc::types::MexcOrderData;
use basis_integration::protocol::http::rest::RestRequest;
use serde::Serialize;
use std::borrow::Cow;

/// Fetch the venue-authoritative view of a single order.
///
/// See docs: <https://mexcdevelop.github.io/apidocs/spot_v3_en/#query-order>
#[derive(Debug, Clone)]
pub struct QueryOrderRequest {
    query: QueryOrderQuery,
}

impl QueryOrderRequest {
    pub fn new(symbol: String, order_id: String) -> Self {
        Self {
            query: QueryOrderQuery {
                symbol,
                order_id,
                timestamp: request_timestamp(),
                recv_window: RECV_WINDOW_MS,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryOrderQuery {
    symbol: String,
    #[serde(rename = "orderId")]
    order_id: String,
    timestamp: u64,
    #[serde(rename = "recvWindow")]
    recv_window: u64,
}

impl RestRequest for QueryOrderRequest {
    type Response = MexcOrderData;
    type QueryParams = QueryOrderQuery;
    type Body = ();

    fn path(&self) -> Cow<'static, str> {
        Cow::Borrowed("/api/v3/order")
    }

    fn method() -> reqwest::Method {
        reqwest::Method::GET
    }

    fn query_params(&self) -> Option<&Self::QueryParams> {
        Some(&self.query)
    }

    fn max_attempts() -> u8 {
        3
    }
}
