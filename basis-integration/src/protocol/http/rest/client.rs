use crate::{
    error::SocketError,
    metric::Metric,
    protocol::http::{BuildStrategy, HttpParser, rest::RestRequest},
};
use bytes::Bytes;
use std::{borrow::Cow, time::Duration};
use tracing::warn;

/// Configurable REST client capable of executing signed [`RestRequest`]s. Each venue requires
/// a specific combination of [`Signer`](super::super::private::Signer), [`Mac`](hmac::Mac),
/// signature [`Encoder`](super::super::private::encoder::Encoder), and [`HttpParser`].
///
/// Cheap to clone and safe to share across tasks - signing is stateless and `reqwest::Client`
/// is internally reference counted.
#[derive(Debug, Clone)]
pub struct RestClient<'a, Strategy, Parser> {
    /// HTTP [`reqwest::Client`] executing signed [`reqwest::Request`]s.
    pub http_client: reqwest::Client,

    /// Base Url of the API being interacted with.
    pub base_url: Cow<'a, str>,

    /// [`RestRequest`] build strategy implementing [`BuildStrategy`].
    pub strategy: Strategy,

    /// [`HttpParser`] deserialising [`RestRequest::Response`]s, and upon failure parsing
    /// API errors returned from the server.
    pub parser: Parser,
}

impl<Strategy, Parser> RestClient<'_, Strategy, Parser>
where
    Strategy: BuildStrategy,
    Parser: HttpParser,
{
    /// Execute the provided [`RestRequest`].
    pub async fn execute<Request>(
        &self,
        request: Request,
    ) -> Result<(Request::Response, Metric), Parser::OutputError>
    where
        Request: RestRequest,
    {
        // Use the provided Request to construct a signed reqwest::Request
        let request = self.build(request)?;

        // Measure request execution
        let (status, payload, latency) = self.measured_execution::<Request>(request).await?;

        // Attempt to parse API Success or Error response
        self.parser
            .parse::<Request::Response>(status, &payload)
            .map(|response| (response, latency))
    }

    /// Execute the provided [`RestRequest`], retrying transient failures up to
    /// [`RestRequest::max_attempts`] with the provided backoff between attempts.
    ///
    /// Deterministic business errors surface immediately - retrying an "insufficient balance"
    /// response cannot succeed.
    pub async fn execute_with_retry<Request>(
        &self,
        request: Request,
        backoff: Duration,
    ) -> Result<(Request::Response, Metric), Parser::OutputError>
    where
        Request: RestRequest + Clone,
        Parser::OutputError: crate::error::Transient + std::fmt::Display,
    {
        use crate::error::Transient;

        let max_attempts = Request::max_attempts().max(1);

        let mut attempt = 1;
        loop {
            match self.execute(request.clone()).await {
                Ok(response) => break Ok(response),
                Err(error) if attempt < max_attempts && error.is_transient() => {
                    warn!(
                        attempt,
                        max_attempts,
                        %error,
                        "transient HTTP failure - retrying after backoff"
                    );
                    tokio::time::sleep(backoff * u32::from(attempt)).await;
                    attempt += 1;
                }
                Err(error) => break Err(error),
            }
        }
    }

    /// Use the provided [`RestRequest`] to construct a signed HTTP [`reqwest::Request`].
    pub fn build<Request>(&self, request: Request) -> Result<reqwest::Request, SocketError>
    where
        Request: RestRequest,
    {
        // Construct url
        let url = format!("{}{}", self.base_url, request.path());

        // Construct RequestBuilder with method, url & timeout
        let mut builder = self
            .http_client
            .request(Request::method(), url)
            .timeout(Request::timeout());

        // Add optional query parameters
        if let Some(query_params) = request.query_params() {
            builder = builder.query(query_params);
        }

        // Add optional Body
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        // Use BuildStrategy (public or private) to build the reqwest::Request
        self.strategy.build(request, builder)
    }

    /// Execute the built [`reqwest::Request`] using the [`reqwest::Client`].
    ///
    /// Measures and returns the HTTP request round trip duration.
    pub async fn measured_execution<Request>(
        &self,
        request: reqwest::Request,
    ) -> Result<(reqwest::StatusCode, Bytes, Metric), SocketError>
    where
        Request: RestRequest,
    {
        let latency = Metric::new("http_request_duration")
            .tag("http_method", Request::method().as_str())
            .tag("base_url", self.base_url.as_ref())
            .tag("path", request.url().path().to_string());

        let start = std::time::Instant::now();
        let response = self.http_client.execute(request).await?;
        let duration_ms = start.elapsed().as_millis() as u64;

        let latency = latency
            .tag("status_code", response.status().as_str().to_string())
            .field("duration_ms", duration_ms);

        let status_code = response.status();
        let payload = response.bytes().await?;

        Ok((status_code, payload, latency))
    }
}

impl<'a, Strategy, Parser> RestClient<'a, Strategy, Parser> {
    /// Construct a new [`Self`] using the provided configuration.
    pub fn new<Url: Into<Cow<'a, str>>>(base_url: Url, strategy: Strategy, parser: Parser) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: base_url.into(),
            strategy,
            parser,
        }
    }
}
