//! OAuth1 request signing.
//!
//! The client never builds an `Authorization` header itself; it hands the
//! request parts to a [`Signer`]. [`HmacSha1Signer`] is the default and is what
//! Mautic expects. Tests and exotic deployments can plug in their own.

mod hmac_sha1;

pub use hmac_sha1::HmacSha1Signer;

use crate::{Error, TokenPair};
use http::{HeaderValue, Method};
use std::sync::Arc;
use url::Url;

/// Mautic's OAuth1 endpoints, relative to the host.
pub(crate) const REQUEST_TOKEN_PATH: [&str; 3] = ["oauth", "v1", "request_token"];
pub(crate) const ACCESS_TOKEN_PATH: [&str; 3] = ["oauth", "v1", "access_token"];
pub(crate) const AUTHORIZE_PATH: [&str; 3] = ["oauth", "v1", "authorize"];

/// Everything a signer may fold into the signature.
pub struct SigningRequest<'a> {
    pub method: &'a Method,
    /// Target URL. Query pairs already present on it are signed as well.
    pub url: &'a Url,
    /// Query pairs appended by the transport.
    pub query: &'a [(String, String)],
    /// Form pairs sent as `application/x-www-form-urlencoded`.
    /// JSON bodies never appear here.
    pub form: &'a [(String, String)],
    /// Request token during the handshake, access token afterwards.
    pub token: Option<&'a TokenPair>,
    /// Additional `oauth_*` protocol parameters such as `oauth_callback`.
    pub protocol_params: &'a [(String, String)],
}

/// Produces the `Authorization` header for one request attempt.
pub trait Signer: Send + Sync + 'static {
    fn authorization(&self, req: &SigningRequest<'_>) -> Result<HeaderValue, Error>;

    /// Secret material to scrub from error snippets.
    fn secrets(&self) -> Vec<&str> {
        Vec::new()
    }
}

pub type DynSigner = Arc<dyn Signer>;

impl<T: Signer + ?Sized> Signer for Arc<T> {
    fn authorization(&self, req: &SigningRequest<'_>) -> Result<HeaderValue, Error> {
        (**self).authorization(req)
    }

    fn secrets(&self) -> Vec<&str> {
        (**self).secrets()
    }
}

/// Parse a form-encoded token endpoint response
/// (`oauth_token=...&oauth_token_secret=...`).
pub(crate) fn parse_token_pair(body: &[u8]) -> Option<TokenPair> {
    let mut token = None;
    let mut secret = None;
    for (key, value) in url::form_urlencoded::parse(body) {
        match key.as_ref() {
            "oauth_token" => token = Some(value.into_owned()),
            "oauth_token_secret" => secret = Some(value.into_owned()),
            _ => {}
        }
    }
    match (token, secret) {
        (Some(token), Some(secret)) if !token.is_empty() => Some(TokenPair::new(token, secret)),
        _ => None,
    }
}
