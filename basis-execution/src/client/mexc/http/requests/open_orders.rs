use super::{RECV_WINDOW_MS, request_timestamp};
use crate::client::mexc::types::MexcOrderData;
use basis_integration::protocol::http::rest::RestRequest;
use serde::Serialize;
use std::borrow::Cow;

/// Fetch all open orders on a symbol.
///
/// See docs: <https://mexcdevelop.github.io/apidocs/spot_v3_en/#current-open-orders>
#[derive(Debug, Clone)]
pub struct OpenOrdersRequest {
    query: OpenOrdersQuery,
}

impl OpenOrdersRequest {
    pub fn new(symbol: String) -> Self {
        Self {
            query: OpenOrdersQuery {
                symbol,
                timestamp: request_timestamp(),
                recv_window: RECV_WINDOW_MS,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OpenOrdersQuery {
    symbol: String,
    timestamp: u64,
    #[serde(rename = "recvWindow")]
    recv_window: u64,
}

impl RestRequest for OpenOrdersRequest {
    type Response = Vec<MexcOrderData>;
    type QueryParams = OpenOrdersQuery;
    type Body = ();

    fn path(&self) -> Cow<'static, str> {
        Cow::Borrowed("/api/v3/openOrders")
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
