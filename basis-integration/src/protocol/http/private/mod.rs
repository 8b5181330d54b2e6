use self::encoder::Encoder;
use super::{BuildStrategy, rest::RestRequest};
use crate::error::SocketError;
use derive_more::Constructor;
use hmac::Mac;

/// [`Encoder`] implementations for encoding signature bytes (hex, base64).
pub mod encoder;

/// Venue specific signing logic used by a [`RequestSigner`].
///
/// Each implementation defines what configuration a signature requires (api key, timestamp,
/// request path, ..), which bytes are fed to the [`Mac`], and how the signed
/// [`reqwest::Request`] is assembled (headers vs extra query parameters).
pub trait Signer {
    /// Configuration required to sign every [`RestRequest`] for this venue.
    type Config<'a>
    where
        Self: 'a;

    /// Derive the signing configuration for the provided [`RestRequest`].
    fn config<'a, Request>(
        &'a self,
        request: Request,
        builder: &reqwest::RequestBuilder,
    ) -> Result<Self::Config<'a>, SocketError>
    where
        Request: RestRequest;

    /// Feed the canonical bytes-to-sign into the provided [`Mac`].
    fn add_bytes_to_sign<M>(mac: &mut M, config: &Self::Config<'_>)
    where
        M: Mac;

    /// Assemble the final signed [`reqwest::Request`] from the configuration, builder, and
    /// encoded signature.
    fn build_signed_request(
        config: Self::Config<'_>,
        builder: reqwest::RequestBuilder,
        signature: String,
    ) -> Result<reqwest::Request, SocketError>;
}

/// [`BuildStrategy`] that signs [`RestRequest`]s with venue [`Signer`] logic, a hashable
/// [`Mac`], and a signature [`Encoder`].
#[derive(Debug, Clone, Constructor)]
pub struct RequestSigner<Sig, HmacMac, SignatureEncoder> {
    signer: Sig,
    mac: HmacMac,
    encoder: SignatureEncoder,
}

impl<Sig, HmacMac, SignatureEncoder> BuildStrategy for RequestSigner<Sig, HmacMac, SignatureEncoder>
where
    Sig: Signer,
    HmacMac: Mac + Clone,
    SignatureEncoder: Encoder,
{
    fn build<Request>(
        &self,
        request: Request,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Request, SocketError>
    where
        Request: RestRequest,
    {
        let config = self.signer.config(request, &builder)?;

        let mut mac = self.mac.clone();
        Sig::add_bytes_to_sign(&mut mac, &config);
        let signature = self.encoder.encode(mac.finalize().into_bytes());

        Sig::build_signed_request(config, builder, signature)
    }
}
