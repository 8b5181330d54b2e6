use basis_instrument::exchange::ExchangeId;
use basis_integration::error::SocketError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// All errors a venue [`ExecutionClient`](crate::client::ExecutionClient) can surface.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Error)]
pub enum ClientError {
    #[error("Connectivity: {0}")]
    Connectivity(#[from] ConnectivityError),

    #[error("API: {0}")]
    Api(#[from] ApiError),

    #[error("failed to fetch AccountSnapshot: {0}")]
    AccountSnapshot(String),

    #[error("failed to init AccountStream: {0}")]
    AccountStream(String),
}

impl basis_integration::error::Transient for ClientError {
    /// Deterministic business failures are never retried - re-sending an "insufficient
    /// balance" order cannot succeed.
    fn is_transient(&self) -> bool {
        match self {
            ClientError::Connectivity(_) => true,
            ClientError::Api(api) => matches!(api, ApiError::RateLimit),
            _ => false,
        }
    }
}

impl ClientError {
    pub fn is_transient(&self) -> bool {
        basis_integration::error::Transient::is_transient(self)
    }
}

/// Transport level failures - retried with backoff.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Error)]
pub enum ConnectivityError {
    #[error("venue offline: {0}")]
    ExchangeOffline(ExchangeId),

    #[error("request timed out")]
    Timeout,

    #[error("{0}")]
    Socket(String),
}

impl From<SocketError> for ConnectivityError {
    fn from(value: SocketError) -> Self {
        match value {
            SocketError::HttpTimeout(_) => Self::Timeout,
            other => Self::Socket(other.to_string()),
        }
    }
}

impl From<SocketError> for ClientError {
    fn from(value: SocketError) -> Self {
        match &value {
            SocketError::HttpResponse(status, _)
                if *status == reqwest::StatusCode::TOO_MANY_REQUESTS
                    || status.as_u16() == 418 =>
            {
                Self::Api(ApiError::RateLimit)
            }
            SocketError::HttpResponse(status, _) if *status == reqwest::StatusCode::UNAUTHORIZED => {
                Self::Api(ApiError::Unauthorised)
            }
            _ => Self::Connectivity(ConnectivityError::from(value)),
        }
    }
}

/// Venue business failures, mapped from venue error payloads.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Error)]
pub enum ApiError {
    #[error("rate limit exceeded")]
    RateLimit,
    #[error("request authorisation invalid")]
    Unauthorised,
    #[error("asset {0} balance insufficient: {1}")]
    BalanceInsufficient(String, String),
    #[error("symbol {0} invalid: {1}")]
    SymbolInvalid(String, String),
    #[error("trading disabled: {0}")]
    TradingDisabled(String),
    #[error("order rejected: {0}")]
    OrderRejected(String),
    #[error("order not found")]
    OrderNotFound,
    #[error("operation unsupported by venue: {0}")]
    UnsupportedOperation(String),
    #[error("venue error ({0}): {1}")]
    Other(String, String),
}

/// Failure of an individual order action, keeping the offending order identity attached.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Error)]
#[error("order {client_order_id:?} failed: {error}")]
pub struct OrderError {
    pub client_order_id: Option<crate::order::id::ClientOrderId>,
    pub error: ClientError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_is_transient() {
        struct TestCase {
            input: ClientError,
            expected: bool,
        }

        let tests = vec![
            TestCase {
                // TC0: connectivity timeout is transient
                input: ClientError::Connectivity(ConnectivityError::Timeout),
                expected: true,
            },
            TestCase {
                // TC1: rate limit is transient
                input: ClientError::Api(ApiError::RateLimit),
                expected: true,
            },
            TestCase {
                // TC2: insufficient balance is deterministic
                input: ClientError::Api(ApiError::BalanceInsufficient(
                    "usdt".to_string(),
                    "".to_string(),
                )),
                expected: false,
            },
            TestCase {
                // TC3: auth failure is deterministic
                input: ClientError::Api(ApiError::Unauthorised),
                expected: false,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            assert_eq!(test.input.is_transient(), test.expected, "TC{index} failed");
        }
    }
}
