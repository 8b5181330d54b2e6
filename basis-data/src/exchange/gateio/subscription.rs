use super::message::GateioError;
use basis_integration::{Validator, error::SocketError};
use serde::{Deserialize, Serialize};

/// Gate.io WebSocket message in response to a subscription request.
///
/// ### Raw Payload Examples
/// #### Subscription success
/// ```json
/// {
///     "time": 1606292218,
///     "channel": "futures.book_ticker",
///     "event": "subscribe",
///     "result": { "status": "success" }
/// }
/// ```
///
/// #### Subscription failure
/// ```json
/// {
///     "time": 1606292218,
///     "channel": "futures.book_ticker",
///     "event": "subscribe",
///     "error": { "code": 2, "message": "unknown contract GIBBERISH_USDT" },
///     "result": null
/// }
/// ```
#[derive(Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
pub struct GateioSubResponse {
    pub channel: String,
    pub event: String,
    pub error: Option<GateioError>,
}

impl Validator for GateioSubResponse {
    fn validate(self) -> Result<Self, SocketError>
    where
        Self: Sized,
    {
        match &self.error {
            None => Ok(self),
            Some(failure) => Err(SocketError::Subscribe(format!(
                "received failure subscription response code: {} with message: {}",
                failure.code, failure.message,
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod de {
        use super::*;

        #[test]
        fn test_gateio_sub_response() {
            struct TestCase {
                input: &'static str,
                expected: Result<GateioSubResponse, SocketError>,
            }

            let tests = vec![
                TestCase {
                    // TC0: input response is subscription success
                    input: r#"
                    {
                        "time": 1606292218,
                        "time_ms": 1606292218231,
                        "channel": "futures.book_ticker",
                        "event": "subscribe",
                        "result": { "status": "success" }
                    }
                    "#,
                    expected: Ok(GateioSubResponse {
                        channel: "futures.book_ticker".to_string(),
                        event: "subscribe".to_string(),
                        error: None,
                    }),
                },
                TestCase {
                    // TC1: input response is subscription failure
                    input: r#"
                    {
                        "time": 1606292218,
                        "channel": "futures.book_ticker",
                        "event": "subscribe",
                        "error": { "code": 2, "message": "unknown contract GIBBERISH_USDT" },
                        "result": null
                    }
                    "#,
                    expected: Ok(GateioSubResponse {
                        channel: "futures.book_ticker".to_string(),
                        event: "subscribe".to_string(),
                        error: Some(GateioError {
                            code: 2,
                            message: "unknown contract GIBBERISH_USDT".to_string(),
                        }),
                    }),
                },
            ];

            for (index, test) in tests.into_iter().enumerate() {
                let actual = serde_json::from_str::<GateioSubResponse>(test.input);
                match (actual, test.expected) {
                    (Ok(actual), Ok(expected)) => {
                        assert_eq!(actual, expected, "TC{index} failed")
                    }
                    (Err(_), Err(_)) => {
                        // Test passed
                    }
                    (actual, expected) => {
                        panic!(
                            "TC{index} failed because actual != expected. \
                             \nActual: {actual:?}\nExpected: {expected:?}\n"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_validate_gateio_sub_response() {
        struct TestCase {
            input: GateioSubResponse,
            is_valid: bool,
        }

        let tests = vec![
            TestCase {
                // TC0: success response
                input: GateioSubResponse {
                    channel: "futures.book_ticker".to_string(),
                    event: "subscribe".to_string(),
                    error: None,
                },
                is_valid: true,
            },
            TestCase {
                // TC1: failure response
                input: GateioSubResponse {
                    channel: "futures.book_ticker".to_string(),
                    event: "subscribe".to_string(),
                    error: Some(GateioError {
                        code: 2,
                        message: "unknown contract".to_string(),
                    }),
                },
                is_valid: false,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            assert_eq!(test.input.validate().is_ok(), test.is_valid, "TC{index} failed");
        }
    }
}
