/// Venue specific [`Signer`](basis_integration::protocol::http::private::Signer) logic.
pub mod signer;

/// [`HttpParser`](basis_integration::protocol::http::HttpParser) mapping MEXC error payloads.
pub mod parser;

/// Typed REST requests.
pub mod requests;

/// MEXC spot REST API base url.
pub const HTTP_BASE_URL_MEXC: &str = "https://api.mexc.com";
