use basis_integration::{
    error::SocketError,
    protocol::http::{
        private::{RequestSigner, Signer, encoder::HexEncoder},
        rest::RestRequest,
    },
};
use derive_more::Constructor;

/// MEXC signs the url-encoded query string (which includes `timestamp` and `recvWindow`)
/// with HMAC-SHA256, appending the hex signature as a final `signature` query parameter.
///
/// See docs: <https://mexcdevelop.github.io/apidocs/spot_v3_en/#signed>
pub type MexcRequestSigner = RequestSigner<MexcSigner, hmac::Hmac<sha2::Sha256>, HexEncoder>;

#[derive(Debug, Clone, Constructor)]
pub struct MexcSigner {
    pub api_key: String,
}

pub struct MexcSignConfig<'a> {
    api_key: &'a str,
    request_params_to_sign: String,
}

impl Signer for MexcSigner {
    type Config<'a>
        = MexcSignConfig<'a>
    where
        Self: 'a;

    fn config<'a, Request>(
        &'a self,
        request: Request,
        _: &reqwest::RequestBuilder,
    ) -> Result<Self::Config<'a>, SocketError>
    where
        Request: RestRequest,
    {
        // Every signed MEXC request carries its parameters (timestamp included) as query
        // params - the canonical string to sign is their url-encoding
        let request_params_to_sign = match request.query_params() {
            Some(params) => serde_urlencoded::to_string(params)?,
            None => String::default(),
        };

        Ok(MexcSignConfig {
            api_key: self.api_key.as_str(),
            request_params_to_sign,
        })
    }

    fn add_bytes_to_sign<M>(mac: &mut M, config: &Self::Config<'_>)
    where
        M: hmac::Mac,
    {
        mac.update(config.request_params_to_sign.as_bytes());
    }

    fn build_signed_request(
        config: Self::Config<'_>,
        builder: reqwest::RequestBuilder,
        signature: String,
    ) -> Result<reqwest::Request, SocketError> {
        const HEADER_API_KEY: &str = "X-MEXC-APIKEY";
        const QUERY_SIGNATURE: &str = "signature";

        builder
            .header(HEADER_API_KEY, config.api_key)
            .query(&[(QUERY_SIGNATURE, signature)])
            .build()
            .map_err(SocketError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hmac::Mac;
    use serde::Serialize;
    use std::borrow::Cow;

    #[derive(Debug, Clone, Serialize)]
    struct TestQuery {
        symbol: &'static str,
        timestamp: u64,
        #[serde(rename = "recvWindow")]
        recv_window: u64,
    }

    #[derive(Debug, Clone)]
    struct TestRequest {
        query: TestQuery,
    }

    impl RestRequest for TestRequest {
        type Response = serde_json::Value;
        type QueryParams = TestQuery;
        type Body = ();

        fn path(&self) -> Cow<'static, str> {
            Cow::Borrowed("/api/v3/order")
        }

        fn method() -> reqwest::Method {
            reqwest::Method::POST
        }

        fn query_params(&self) -> Option<&Self::QueryParams> {
            Some(&self.query)
        }
    }

    #[test]
    fn test_mexc_signer_canonical_query_string() {
        let signer = MexcSigner::new("key".to_string());
        let builder = reqwest::Client::new().request(reqwest::Method::POST, "https://x");

        let request = TestRequest {
            query: TestQuery {
                symbol: "BTCUSDT",
                timestamp: 1609459200000,
                recv_window: 5000,
            },
        };
        let config = signer.config(request, &builder).unwrap();
        assert_eq!(
            config.request_params_to_sign,
            "symbol=BTCUSDT&timestamp=1609459200000&recvWindow=5000"
        );

        // Known-answer signature over the canonical string
        let mut mac =
            hmac::Hmac::<sha2::Sha256>::new_from_slice(b"secret").unwrap();
        mac.update(config.request_params_to_sign.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());
        assert_eq!(signature.len(), 64);
    }
}
