use serde::{Deserialize, Serialize};

/// Gate.io WebSocket message envelope.
///
/// ### Raw Payload Examples
/// #### Subscription success
/// See docs: <https://www.gate.io/docs/developers/futures/ws/en/>
/// ```json
/// {
///     "time": 1606292218,
///     "time_ms": 1606292218231,
///     "channel": "futures.book_ticker",
///     "event": "subscribe",
///     "result": {
///         "status": "success"
///     }
/// }
/// ```
///
/// #### Book ticker update
/// ```json
/// {
///     "time": 1615366379,
///     "time_ms": 1615366379123,
///     "channel": "futures.book_ticker",
///     "event": "update",
///     "result": {
///         "t": 1615366379123,
///         "u": 2517661076,
///         "s": "BTC_USDT",
///         "b": "54696.6",
///         "B": "1223",
///         "a": "54696.7",
///         "A": "1543"
///     }
/// }
/// ```
#[derive(Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
pub struct GateioMessage<T> {
    pub channel: String,
    pub error: Option<GateioError>,
    #[serde(rename = "result")]
    pub data: T,
}

/// Gate.io WebSocket error message.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize, Serialize)]
pub struct GateioError {
    pub code: u8,
    pub message: String,
}
