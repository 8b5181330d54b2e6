/// Venue specific [`Signer`](basis_integration::protocol::http::private::Signer) logic.
pub mod signer;

/// [`HttpParser`](basis_integration::protocol::http::HttpParser) mapping Gate.io error
/// payloads.
pub mod parser;

/// Typed REST requests.
pub mod requests;

/// Gate.io REST API base url (shared by all products).
pub const HTTP_BASE_URL_GATEIO: &str = "https://api.gateio.ws";
