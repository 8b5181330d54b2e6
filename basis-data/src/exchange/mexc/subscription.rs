use basis_integration::{Validator, error::SocketError};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Aggregation interval of the MEXC aggregated book ticker stream, appended to the
/// subscription topic string.
///
/// eg/ "spot@public.aggre.bookTicker.v3.api.pb@100ms@BTCUSDT"
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Serialize)]
pub enum MexcAggInterval {
    #[serde(rename = "10ms")]
    Ms10,
    #[default]
    #[serde(rename = "100ms")]
    Ms100,
}

impl MexcAggInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            MexcAggInterval::Ms10 => "10ms",
            MexcAggInterval::Ms100 => "100ms",
        }
    }
}

/// WebSocket method for MEXC subscription messages.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MexcWsMethod {
    Subscription,
    Unsubscription,
}

/// Outbound WebSocket message subscribing to or unsubscribing from MEXC topics.
///
/// See docs: <https://mexcdevelop.github.io/apidocs/spot_v3_en/#public-subscription>
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct MexcWsSub<'a> {
    pub method: MexcWsMethod,
    pub params: Cow<'a, [String]>,
    pub id: u64,
}

/// Inbound WebSocket message received from MEXC in response to a subscription attempt.
///
/// ### Raw Payload Examples
/// #### Subscription success
/// ```json
/// { "id": null, "code": 0, "msg": "spot@public.aggre.bookTicker.v3.api.pb@100ms@BTCUSDT" }
/// ```
///
/// #### Subscription failure
/// ```json
/// { "id": null, "code": 1, "msg": "Invalid topic spot@public.aggre.bookTicker.v3.api.pb@100ms@ABC" }
/// ```
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct MexcSubResponse {
    /// Status code of the operation. `0` indicates success.
    pub code: i32,
    /// Optional message carrying error details or the confirmed topic.
    #[serde(rename = "msg", default)]
    pub detail: Option<String>,
}

impl Validator for MexcSubResponse {
    fn validate(self) -> Result<Self, SocketError>
    where
        Self: Sized,
    {
        if self.code == 0 {
            Ok(self)
        } else {
            Err(SocketError::Subscribe(format!(
                "subscription failed with code {}: {}",
                self.code,
                self.detail.as_deref().unwrap_or("no error detail provided")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod de {
        use super::*;

        #[test]
        fn test_mexc_sub_response() {
            struct TestCase {
                input: &'static str,
                expected: MexcSubResponse,
            }

            let tests = vec![
                TestCase {
                    // TC0: subscription success
                    input: r#"{"id":null,"code":0,"msg":"spot@public.aggre.bookTicker.v3.api.pb@100ms@BTCUSDT"}"#,
                    expected: MexcSubResponse {
                        code: 0,
                        detail: Some(
                            "spot@public.aggre.bookTicker.v3.api.pb@100ms@BTCUSDT".to_string(),
                        ),
                    },
                },
                TestCase {
                    // TC1: subscription failure
                    input: r#"{"id":null,"code":1,"msg":"Invalid topic"}"#,
                    expected: MexcSubResponse {
                        code: 1,
                        detail: Some("Invalid topic".to_string()),
                    },
                },
                TestCase {
                    // TC2: success with no detail
                    input: r#"{"code":0}"#,
                    expected: MexcSubResponse {
                        code: 0,
                        detail: None,
                    },
                },
            ];

            for (index, test) in tests.into_iter().enumerate() {
                let actual = serde_json::from_str::<MexcSubResponse>(test.input).unwrap();
                assert_eq!(actual, test.expected, "TC{index} failed");
            }
        }
    }

    mod ser {
        use super::*;

        #[test]
        fn test_mexc_ws_sub() {
            let input = MexcWsSub {
                method: MexcWsMethod::Subscription,
                params: Cow::Owned(vec![
                    "spot@public.aggre.bookTicker.v3.api.pb@100ms@BTCUSDT".to_string(),
                ]),
                id: 123,
            };

            assert_eq!(
                serde_json::to_string(&input).unwrap(),
                r#"{"method":"SUBSCRIPTION","params":["spot@public.aggre.bookTicker.v3.api.pb@100ms@BTCUSDT"],"id":123}"#,
            );
        }
    }

    #[test]
    fn test_validate_mexc_sub_response() {
        struct TestCase {
            input: MexcSubResponse,
            is_valid: bool,
        }

        let tests = vec![
            TestCase {
                // TC0: code 0 is success
                input: MexcSubResponse {
                    code: 0,
                    detail: None,
                },
                is_valid: true,
            },
            TestCase {
                // TC1: non-zero code is failure
                input: MexcSubResponse {
                    code: 1,
                    detail: Some("Invalid topic".to_string()),
                },
                is_valid: false,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            assert_eq!(test.input.validate().is_ok(), test.is_valid, "TC{index} failed");
        }
    }
}
