use crate::client::gateio::types::GateioFuturesOrder;
use basis_integration::protocol::http::rest::RestRequest;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{borrow::Cow, time::Duration};

/// Place a new futures order.
///
/// Sizes are signed contract counts - negative sells. Market orders carry a zero price with
/// `tif: "ioc"`.
///
/// See docs: <https://www.gate.io/docs/developers/apiv4/en/#create-a-futures-order>
#[derive(Debug, Clone)]
pub struct PlaceOrderRequest {
    pub body: PlaceOrderBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaceOrderBody {
    pub contract: String,
    pub size: i64,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    pub tif: &'static str,
    /// Client order text - must carry the `t-` prefix.
    pub text: String,
}

impl RestRequest for PlaceOrderRequest {
    type Response = GateioFuturesOrder;
    type QueryParams = ();
    type Body = PlaceOrderBody;

    fn path(&self) -> Cow<'static, str> {
        Cow::Borrowed("/api/v4/futures/usdt/orders")
    }

    fn method() -> reqwest::Method {
        reqwest::Method::POST
    }

    fn body(&self) -> Option<&Self::Body> {
        Some(&self.body)
    }

    /// Order placement is latency critical and never retried blindly.
    fn timeout() -> Duration {
        Duration::from_secs(3)
    }
}

/// Cancel a single futures order by venue id.
///
/// See docs: <https://www.gate.io/docs/developers/apiv4/en/#cancel-a-single-order-2>
#[derive(Debug, Clone)]
pub struct CancelOrderRequest {
    pub order_id: String,
}

impl RestRequest for CancelOrderRequest {
    type Response = GateioFuturesOrder;
    type QueryParams = ();
    type Body = ();

    fn path(&self) -> Cow<'static, str> {
        Cow::Owned(format!("/api/v4/futures/usdt/orders/{}", self.order_id))
    }

    fn method() -> reqwest::Method {
        reqwest::Method::DELETE
    }

    fn timeout() -> Duration {
        Duration::from_secs(3)
    }
}

/// Cancel all open futures orders on a contract.
///
/// See docs: <https://www.gate.io/docs/developers/apiv4/en/#cancel-all-open-orders-matched-2>
#[derive(Debug, Clone)]
pub struct CancelAllOrdersRequest {
    pub query: ContractQuery,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContractQuery {
    pub contract: String,
}

impl RestRequest for CancelAllOrdersRequest {
    type Response = Vec<GateioFuturesOrder>;
    type QueryParams = ContractQuery;
    type Body = ();

    fn path(&self) -> Cow<'static, str> {
        Cow::Borrowed("/api/v4/futures/usdt/orders")
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

/// Fetch open futures orders on a contract.
///
/// See docs: <https://www.gate.io/docs/developers/apiv4/en/#list-futures-orders>
#[derive(Debug, Clone)]
pub struct OpenOrdersRequest {
    pub query: OpenOrdersQuery,
}

#[derive(Debug, Clone, Serialize)]
pub struct OpenOrdersQuery {
    pub contract: String,
    pub status: &'static str,
}

impl OpenOrdersRequest {
    pub fn new(contract: String) -> Self {
        Self {
            query: OpenOrdersQuery {
                contract,
                status: "open",
            },
        }
    }
}

impl RestRequest for OpenOrdersRequest {
    type Response = Vec<GateioFuturesOrder>;
    type QueryParams = OpenOrdersQuery;
    type Body = ();

    fn path(&self) -> Cow<'static, str> {
        Cow::Borrowed("/api/v4/futures/usdt/orders")
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

/// Fetch a single futures order by venue id.
///
/// See docs: <https://www.gate.io/docs/developers/apiv4/en/#get-a-single-order-2>
#[derive(Debug, Clone)]
pub struct QueryOrderRequest {
    pub order_id: String,
}

impl RestRequest for QueryOrderRequest {
    type Response = GateioFuturesOrder;
    type QueryParams = ();
    type Body = ();

    fn path(&self) -> Cow<'static, str> {
        Cow::Owned(format!("/api/v4/futures/usdt/orders/{}", self.order_id))
    }

    fn method() -> reqwest::Method {
        reqwest::Method::GET
    }

    fn max_attempts() -> u8 {
        3
    }
}

/// Fetch the USDT futures account.
///
/// See docs: <https://www.gate.io/docs/developers/apiv4/en/#query-futures-account>
#[derive(Debug, Clone)]
pub struct AccountsRequest;

/// ### Raw Payload Example
/// ```json
/// { "currency": "USDT", "total": "120.5", "available": "100.5" }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct FuturesAccountResponse {
    pub currency: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub total: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub available: Decimal,
}

impl RestRequest for AccountsRequest {
    type Response = FuturesAccountResponse;
    type QueryParams = ();
    type Body = ();

    fn path(&self) -> Cow<'static, str> {
        Cow::Borrowed("/api/v4/futures/usdt/accounts")
    }

    fn method() -> reqwest::Method {
        reqwest::Method::GET
    }

    fn max_attempts() -> u8 {
        3
    }
}
