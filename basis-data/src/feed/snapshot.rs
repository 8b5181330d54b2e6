use crate::{books::OrderBook, error::DataError};
use basis_instrument::{exchange::ExchangeId, symbol::Symbol};
use basis_integration::{
    error::SocketError,
    protocol::http::{
        HttpParser,
        public::PublicNoHeaders,
        rest::{RestRequest, client::RestClient},
    },
};
use chrono::Utc;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// MEXC spot REST API base url.
pub const HTTP_BASE_URL_MEXC: &str = "https://api.mexc.com";

/// Gate.io REST API base url (shared by all products).
pub const HTTP_BASE_URL_GATEIO: &str = "https://api.gateio.ws";

/// Depth levels requested when seeding a local order book.
const SNAPSHOT_DEPTH_LIMIT: u32 = 100;

/// [`HttpParser`] for public endpoints - no venue error model beyond status + payload.
#[derive(Debug, Copy, Clone)]
pub struct PublicHttpParser;

impl HttpParser for PublicHttpParser {
    type ApiError = serde_json::Value;
    type OutputError = SocketError;

    fn parse_api_error(&self, status: StatusCode, error: Self::ApiError) -> Self::OutputError {
        SocketError::HttpResponse(status, error.to_string())
    }
}

/// Construct an unsigned [`RestClient`] for the provided public base url.
pub fn public_rest_client(
    base_url: &'static str,
) -> RestClient<'static, PublicNoHeaders, PublicHttpParser> {
    RestClient::new(base_url, PublicNoHeaders, PublicHttpParser)
}

/// Fetch an order book snapshot for a MEXC spot symbol.
///
/// See docs: <https://mexcdevelop.github.io/apidocs/spot_v3_en/#order-book>
pub async fn fetch_mexc_depth(
    client: &RestClient<'static, PublicNoHeaders, PublicHttpParser>,
    symbol: &Symbol,
) -> Result<OrderBook, DataError> {
    let request = MexcDepthRequest {
        query: MexcDepthQuery {
            symbol: symbol.market_name(ExchangeId::MexcSpot).to_string(),
            limit: SNAPSHOT_DEPTH_LIMIT,
        },
    };

    let (response, _) = client.execute(request).await?;

    Ok(OrderBook::new(
        response.last_update_id,
        Some(Utc::now()),
        response.bids.iter().map(|level| (level.0, level.1)),
        response.asks.iter().map(|level| (level.0, level.1)),
    ))
}

#[derive(Debug, Clone)]
struct MexcDepthRequest {
    query: MexcDepthQuery,
}

#[derive(Debug, Clone, Serialize)]
struct MexcDepthQuery {
    symbol: String,
    limit: u32,
}

/// ### Raw Payload Example
/// ```json
/// {
///     "lastUpdateId": 1643817120,
///     "bids": [["100.00", "0.5"]],
///     "asks": [["100.01", "0.4"]]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
struct MexcDepthResponse {
    #[serde(rename = "lastUpdateId")]
    last_update_id: u64,
    bids: Vec<MexcDepthLevel>,
    asks: Vec<MexcDepthLevel>,
}

#[derive(Debug, Clone, Deserialize)]
struct MexcDepthLevel(Decimal, Decimal);

impl RestRequest for MexcDepthRequest {
    type Response = MexcDepthResponse;
    type QueryParams = MexcDepthQuery;
    type Body = ();

    fn path(&self) -> Cow<'static, str> {
        Cow::Borrowed("/api/v3/depth")
    }

    fn method() -> reqwest::Method {
        reqwest::Method::GET
    }

    fn query_params(&self) -> Option<&Self::QueryParams> {
        Some(&self.query)
    }
}

/// Fetch an order book snapshot for a Gate.io USDT perpetual contract.
///
/// See docs: <https://www.gate.io/docs/developers/apiv4/en/#futures-order-book>
pub async fn fetch_gateio_futures_depth(
    client: &RestClient<'static, PublicNoHeaders, PublicHttpParser>,
    symbol: &Symbol,
) -> Result<OrderBook, DataError> {
    let request = GateioDepthRequest {
        query: GateioDepthQuery {
            contract: symbol
                .market_name(ExchangeId::GateioPerpetualsUsd)
                .to_string(),
            limit: SNAPSHOT_DEPTH_LIMIT,
            with_id: true,
        },
    };

    let (response, _) = client.execute(request).await?;

    Ok(OrderBook::new(
        response.id,
        Some(Utc::now()),
        response.bids.iter().map(|level| (level.price, level.size)),
        response.asks.iter().map(|level| (level.price, level.size)),
    ))
}

#[derive(Debug, Clone)]
struct GateioDepthRequest {
    query: GateioDepthQuery,
}

#[derive(Debug, Clone, Serialize)]
struct GateioDepthQuery {
    contract: String,
    limit: u32,
    with_id: bool,
}

/// ### Raw Payload Example
/// ```json
/// {
///     "id": 123456,
///     "current": 1623898993.123,
///     "update": 1623898993.121,
///     "asks": [{"p": "1.52", "s": 100}],
///     "bids": [{"p": "1.17", "s": 150}]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
struct GateioDepthResponse {
    id: u64,
    asks: Vec<GateioDepthLevel>,
    bids: Vec<GateioDepthLevel>,
}

#[derive(Debug, Clone, Deserialize)]
struct GateioDepthLevel {
    #[serde(rename = "p", deserialize_with = "crate::exchange::gateio::book::de_decimal_flexible")]
    price: Decimal,
    #[serde(rename = "s", deserialize_with = "crate::exchange::gateio::book::de_decimal_flexible")]
    size: Decimal,
}

impl RestRequest for GateioDepthRequest {
    type Response = GateioDepthResponse;
    type QueryParams = GateioDepthQuery;
    type Body = ();

    fn path(&self) -> Cow<'static, str> {
        Cow::Borrowed("/api/v4/futures/usdt/order_book")
    }

    fn method() -> reqwest::Method {
        reqwest::Method::GET
    }

    fn query_params(&self) -> Option<&Self::QueryParams> {
        Some(&self.query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_de_mexc_depth_response() {
        let input = r#"
        {
            "lastUpdateId": 1643817120,
            "bids": [["100.00", "0.5"], ["99.99", "1.2"]],
            "asks": [["100.01", "0.4"]]
        }
        "#;

        let actual = serde_json::from_str::<MexcDepthResponse>(input).unwrap();
        assert_eq!(actual.last_update_id, 1643817120);
        assert_eq!(actual.bids.len(), 2);
        assert_eq!(actual.bids[0].0, dec!(100.00));
        assert_eq!(actual.asks[0].1, dec!(0.4));
    }

    #[test]
    fn test_de_gateio_depth_response() {
        let input = r#"
        {
            "id": 123456,
            "current": 1623898993.123,
            "update": 1623898993.121,
            "asks": [{"p": "1.52", "s": 100}],
            "bids": [{"p": "1.17", "s": 150}]
        }
        "#;

        let actual = serde_json::from_str::<GateioDepthResponse>(input).unwrap();
        assert_eq!(actual.id, 123456);
        assert_eq!(actual.asks[0].price, dec!(1.52));
        assert_eq!(actual.bids[0].size, dec!(150));
    }
}
