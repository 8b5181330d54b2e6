use super::{RECV_WINDOW_MS, request_timestamp};
use basis_integration::protocol::http::rest::RestRequest;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Time between listen-key keep-alive calls. Keys expire after ~60 minutes of silence.
pub const LISTEN_KEY_KEEPALIVE_INTERVAL: std::time::Duration =
    std::time::Duration::from_secs(30 * 60);

/// Obtain a listen key for the private data stream.
///
/// See docs: <https://mexcdevelop.github.io/apidocs/spot_v3_en/#listen-key>
#[derive(Debug, Clone)]
pub struct CreateListenKeyRequest {
    query: ListenKeyAuthQuery,
}

impl CreateListenKeyRequest {
    pub fn new() -> Self {
        Self {
            query: ListenKeyAuthQuery {
                listen_key: None,
                timestamp: request_timestamp(),
                recv_window: RECV_WINDOW_MS,
            },
        }
    }
}

impl Default for CreateListenKeyRequest {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ListenKeyAuthQuery {
    #[serde(rename = "listenKey", skip_serializing_if = "Option::is_none")]
    listen_key: Option<String>,
    timestamp: u64,
    #[serde(rename = "recvWindow")]
    recv_window: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListenKeyResponse {
    #[serde(rename = "listenKey")]
    pub listen_key: String,
}

impl RestRequest for CreateListenKeyRequest {
    type Response = ListenKeyResponse;
    type QueryParams = ListenKeyAuthQuery;
    type Body = ();

    fn path(&self) -> Cow<'static, str> {
        Cow::Borrowed("/api/v3/userDataStream")
    }

    fn method() -> reqwest::Method {
        reqwest::Method::POST
    }

    fn query_params(&self) -> Option<&Self::QueryParams> {
        Some(&self.query)
    }

    fn max_attempts() -> u8 {
        3
    }
}

/// Extend the validity of an existing listen key.
#[derive(Debug, Clone)]
pub struct KeepAliveListenKeyRequest {
    query: ListenKeyAuthQuery,
}

impl KeepAliveListenKeyRequest {
    pub fn new(listen_key: String) -> Self {
        Self {
            query: ListenKeyAuthQuery {
                listen_key: Some(listen_key),
                timestamp: request_timestamp(),
                recv_window: RECV_WINDOW_MS,
            },
        }
    }
}

impl RestRequest for KeepAliveListenKeyRequest {
    type Response = ListenKeyResponse;
    type QueryParams = ListenKeyAuthQuery;
    type Body = ();

    fn path(&self) -> Cow<'static, str> {
        Cow::Borrowed("/api/v3/userDataStream")
    }

    fn method() -> reqwest::Method {
        reqwest::Method::PUT
    }

    fn query_params(&self) -> Option<&Self::QueryParams> {
        Some(&self.query)
    }
}

/// Invalidate a listen key after rotating to a fresh one.
#[derive(Debug, Clone)]
pub struct DeleteListenKeyRequest {
    query: ListenKeyAuthQuery,
}

impl DeleteListenKeyRequest {
    pub fn new(listen_key: String) -> Self {
        Self {
            query: ListenKeyAuthQuery {
                listen_key: Some(listen_key),
                timestamp: request_timestamp(),
                recv_window: RECV_WINDOW_MS,
            },
        }
    }
}

impl RestRequest for DeleteListenKeyRequest {
    type Response = serde_json::Value;
    type QueryParams = ListenKeyAuthQuery;
    type Body = ();

    fn path(&self) -> Cow<'static, str> {
        Cow::Borrowed("/api/v3/userDataStream")
    }

    fn method() -> reqwest::Method {
        reqwest::Method::DELETE
    }

    fn query_params(&self) -> Option<&Self::QueryParams> {
        Some(&self.query)
    }
}
