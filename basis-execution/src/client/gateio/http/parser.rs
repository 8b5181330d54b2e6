use crate::error::{ApiError, ClientError};
use basis_integration::protocol::http::HttpParser;
use reqwest::StatusCode;
use serde::Deserialize;

/// Gate.io API error payload.
///
/// ### Raw Payload Example
/// ```json
/// { "label": "BALANCE_NOT_ENOUGH", "message": "Not enough balance" }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct GateioApiError {
    pub label: String,
    #[serde(default)]
    pub message: String,
}

/// [`HttpParser`] mapping Gate.io error payloads into [`ClientError`]s.
#[derive(Debug, Copy, Clone)]
pub struct GateioHttpParser;

impl HttpParser for GateioHttpParser {
    type ApiError = GateioApiError;
    type OutputError = ClientError;

    fn parse_api_error(&self, status: StatusCode, error: Self::ApiError) -> Self::OutputError {
        let api_error = match error.label.as_str() {
            "BALANCE_NOT_ENOUGH" | "MARGIN_NOT_ENOUGH" | "INSUFFICIENT_AVAILABLE" => {
                ApiError::BalanceInsufficient(String::default(), error.message)
            }
            "CONTRACT_NOT_FOUND" | "INVALID_CURRENCY_PAIR" => {
                ApiError::SymbolInvalid(String::default(), error.message)
            }
            "ORDER_NOT_FOUND" => ApiError::OrderNotFound,
            "INVALID_KEY" | "INVALID_SIGNATURE" | "FORBIDDEN" => ApiError::Unauthorised,
            "CONTRACT_IN_DELISTING" | "TRADE_RESTRICTED" => {
                ApiError::TradingDisabled(error.message)
            }
            "POC_FILL_IMMEDIATELY" | "ORDER_POC_IMMEDIATE" => {
                ApiError::OrderRejected(error.message)
            }
            _ if status == StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimit,
            label => ApiError::Other(label.to_string(), error.message),
        };

        ClientError::Api(api_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_api_error_mapping() {
        struct TestCase {
            label: &'static str,
            status: StatusCode,
            expected: ApiError,
        }

        let tests = vec![
            TestCase {
                // TC0: margin error surfaces as insufficient balance
                label: "MARGIN_NOT_ENOUGH",
                status: StatusCode::BAD_REQUEST,
                expected: ApiError::BalanceInsufficient(String::default(), "msg".to_string()),
            },
            TestCase {
                // TC1: unknown contract
                label: "CONTRACT_NOT_FOUND",
                status: StatusCode::BAD_REQUEST,
                expected: ApiError::SymbolInvalid(String::default(), "msg".to_string()),
            },
            TestCase {
                // TC2: signature failure is fatal
                label: "INVALID_SIGNATURE",
                status: StatusCode::UNAUTHORIZED,
                expected: ApiError::Unauthorised,
            },
            TestCase {
                // TC3: unmapped label with 429
                label: "SOMETHING_ELSE",
                status: StatusCode::TOO_MANY_REQUESTS,
                expected: ApiError::RateLimit,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = GateioHttpParser.parse_api_error(
                test.status,
                GateioApiError {
                    label: test.label.to_string(),
                    message: "msg".to_string(),
                },
            );
            assert_eq!(actual, ClientError::Api(test.expected), "TC{index} failed");
        }
    }
}
