//! Transport layer: the wire client plus composable middleware.
//!
//! Layers are stacked innermost-first when the client is built:
//! `UreqBlocking` → OAuth1 signing → retry. Signing sits below retry so every
//! attempt carries a fresh nonce and timestamp.

pub mod blocking_transport;
#[cfg(feature = "metrics")]
pub(crate) mod metrics;
pub mod middleware;
pub mod request;

use crate::TokenPair;
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use std::time::Duration;
use url::Url;

#[derive(Clone, Debug)]
pub struct TransportBody {
    pub bytes: Vec<u8>,
    pub content_type: Option<HeaderValue>,
}

/// OAuth1 material the signing layer folds into the `Authorization` header.
#[derive(Clone, Debug, Default)]
pub struct OAuthParams {
    pub token: Option<TokenPair>,
    pub protocol_params: Vec<(String, String)>,
}

/// Whether the retry layer may send a request again.
///
/// Chosen per operation: contact lookups only read, while creating or
/// updating a contact or enrolling it in a campaign changes server state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Replay {
    /// Read-only; replayed on throttling, gateway errors, timeouts and
    /// connection failures.
    Read,
    /// Changes server state; replayed only when
    /// [`middleware::RetryConfig::replay_writes`] is set, and then only when the
    /// server cannot have acted on it (429, 503, connection refused).
    #[default]
    Write,
    /// OAuth token endpoints. Tokens are single-use.
    Never,
}

#[derive(Clone, Debug)]
pub struct TransportRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    pub form: Vec<(String, String)>,
    pub body: Option<TransportBody>,
    pub timeout: Duration,
    pub replay: Replay,
    /// `None` sends the request unsigned.
    pub oauth: Option<OAuthParams>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ResponseMeta {
    pub retries: usize,
}

#[derive(Clone, Debug)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    pub meta: ResponseMeta,
}
