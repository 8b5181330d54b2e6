use crate::error::{ApiError, ClientError};
use basis_integration::protocol::http::HttpParser;
use reqwest::StatusCode;
use serde::Deserialize;

/// MEXC API error payload.
///
/// ### Raw Payload Example
/// ```json
/// { "code": 30004, "msg": "Insufficient balance" }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct MexcApiError {
    pub code: i64,
    pub msg: String,
}

/// [`HttpParser`] mapping MEXC error payloads into [`ClientError`]s.
#[derive(Debug, Copy, Clone)]
pub struct MexcHttpParser;

impl HttpParser for MexcHttpParser {
    type ApiError = MexcApiError;
    type OutputError = ClientError;

    fn parse_api_error(&self, status: StatusCode, error: Self::ApiError) -> Self::OutputError {
        let api_error = match error.code {
            // Oversold / insufficient position
            30004 | 30005 => {
                ApiError::BalanceInsufficient(String::default(), error.msg)
            }
            // Symbol not support API / trading suspended
            10007 | 30016 => ApiError::TradingDisabled(error.msg),
            // Invalid symbol
            30014 | 10015 => ApiError::SymbolInvalid(String::default(), error.msg),
            // Order does not exist
            30026 | -2013 => ApiError::OrderNotFound,
            // Signature / api key failures are fatal for this client
            700002 | 10072 => ApiError::Unauthorised,
            _ if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() == 418 => {
                ApiError::RateLimit
            }
            code => ApiError::Other(code.to_string(), error.msg),
        };

        ClientError::Api(api_error)
    }
}
