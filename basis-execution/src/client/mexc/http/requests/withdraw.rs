use super::{RECV_WINDOW_MS, request_timestamp};
use basis_integration::protocol::http::rest::RestRequest;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Request an on-chain withdrawal.
///
/// See docs: <https://mexcdevelop.github.io/apidocs/spot_v3_en/#withdraw>
#[derive(Debug, Clone)]
pub struct WithdrawApplyRequest {
    query: WithdrawQuery,
}

impl WithdrawApplyRequest {
    pub fn new(
        coin: String,
        network: Option<String>,
        address: String,
        amount: Decimal,
    ) -> Self {
        Self {
            query: WithdrawQuery {
                coin,
                network,
                address,
                amount,
                timestamp: request_timestamp(),
                recv_window: RECV_WINDOW_MS,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WithdrawQuery {
    coin: String,
    #[serde(rename = "netWork", skip_serializing_if = "Option::is_none")]
    network: Option<String>,
    address: String,
    amount: Decimal,
    timestamp: u64,
    #[serde(rename = "recvWindow")]
    recv_window: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WithdrawResponse {
    pub id: String,
}

impl RestRequest for WithdrawApplyRequest {
    type Response = WithdrawResponse;
    type QueryParams = WithdrawQuery;
    type Body = ();

    fn path(&self) -> Cow<'static, str> {
        Cow::Borrowed("/api/v3/capital/withdraw/apply")
    }

    fn method() -> reqwest::Method {
        reqwest::Method::POST
    }

    fn query_params(&self) -> Option<&Self::QueryParams> {
        Some(&self.query)
    }
}
