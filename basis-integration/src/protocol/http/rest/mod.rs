use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;

/// Configurable [`client::RestClient`] capable of executing signed [`RestRequest`]s and
/// parsing responses.
pub mod client;

/// Default HTTP [`reqwest::Request`] timeout Duration.
const DEFAULT_HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP REST request executable by a [`RestClient`](self::client::RestClient).
pub trait RestRequest {
    /// Expected response type if this request was successful.
    type Response: DeserializeOwned;

    /// Serialisable query parameters type - use unit struct () if not required.
    type QueryParams: Serialize;

    /// Serialisable body type - use unit struct () if not required.
    type Body: Serialize;

    /// Additional [`Url`](url::Url) path to the resource.
    fn path(&self) -> std::borrow::Cow<'static, str>;

    /// HTTP [`reqwest::Method`] of this request.
    fn method() -> reqwest::Method;

    /// Optional query parameters for this request.
    fn query_params(&self) -> Option<&Self::QueryParams> {
        None
    }

    /// Optional body for this request.
    fn body(&self) -> Option<&Self::Body> {
        None
    }

    /// HTTP request timeout [`Duration`].
    ///
    /// Venue integrations override this per endpoint (order placement is latency critical,
    /// catalog fetches are not).
    fn timeout() -> Duration {
        DEFAULT_HTTP_REQUEST_TIMEOUT
    }

    /// Maximum number of attempts for this request, including the first.
    ///
    /// Only transient failures are retried, see [`Transient`](crate::error::Transient).
    fn max_attempts() -> u8 {
        1
    }
}
