//! Hand-rolled prost message definitions for the MEXC V3 public push protocol.
//!
//! Only the message shapes this crate consumes are defined - the wrapper envelope and the
//! aggregated book ticker body.
//!
//! See docs: <https://mexcdevelop.github.io/apidocs/spot_v3_en/#websocket-market-data>

/// Envelope wrapping every MEXC V3 push message.
#[derive(Clone, PartialEq, prost::Message)]
pub struct PushDataV3ApiWrapper {
    /// Full topic the payload belongs to,
    /// eg/ `spot@public.aggre.bookTicker.v3.api.pb@100ms@BTCUSDT`.
    #[prost(string, tag = "1")]
    pub channel: String,

    #[prost(string, optional, tag = "3")]
    pub symbol: Option<String>,

    #[prost(string, optional, tag = "4")]
    pub symbol_id: Option<String>,

    /// Venue creation time of the payload, milliseconds since the Unix epoch.
    #[prost(int64, optional, tag = "5")]
    pub create_time: Option<i64>,

    /// Venue send time of the payload, milliseconds since the Unix epoch.
    #[prost(int64, optional, tag = "6")]
    pub send_time: Option<i64>,

    #[prost(oneof = "push_data_v3_api_wrapper::Body", tags = "313")]
    pub body: Option<push_data_v3_api_wrapper::Body>,
}

pub mod push_data_v3_api_wrapper {
    /// Payload variants of the push envelope.
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Body {
        #[prost(message, tag = "313")]
        PublicAggreBookTicker(super::PublicAggreBookTickerV3Api),
    }
}

/// Aggregated best bid/ask push payload. All amounts are decimal strings.
#[derive(Clone, PartialEq, prost::Message)]
pub struct PublicAggreBookTickerV3Api {
    #[prost(string, tag = "1")]
    pub bid_price: String,

    #[prost(string, tag = "2")]
    pub bid_quantity: String,

    #[prost(string, tag = "3")]
    pub ask_price: String,

    #[prost(string, tag = "4")]
    pub ask_quantity: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_push_data_wrapper_round_trip() {
        let wrapper = PushDataV3ApiWrapper {
            channel: "spot@public.aggre.bookTicker.v3.api.pb@100ms@BTCUSDT".to_string(),
            symbol: Some("BTCUSDT".to_string()),
            symbol_id: None,
            create_time: Some(1609459200000),
            send_time: Some(1609459200500),
            body: Some(push_data_v3_api_wrapper::Body::PublicAggreBookTicker(
                PublicAggreBookTickerV3Api {
                    bid_price: "50000.5".to_string(),
                    bid_quantity: "0.1".to_string(),
                    ask_price: "50001".to_string(),
                    ask_quantity: "0.2".to_string(),
                },
            )),
        };

        let encoded = wrapper.encode_to_vec();
        let decoded = PushDataV3ApiWrapper::decode(encoded.as_slice()).unwrap();
        assert_eq!(decoded, wrapper);
    }
}
