use super::{Signer, SigningRequest};
use crate::{Credentials, Error};
use base64::{Engine, engine::general_purpose::STANDARD as B64};
use hmac::{Hmac, Mac};
use http::HeaderValue;
use rand::{Rng, distr::Alphanumeric};
use sha1::Sha1;
use std::{
    borrow::Cow,
    fmt,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use url::Url;

type HmacSha1 = Hmac<Sha1>;
type NonceFn = Arc<dyn Fn() -> String + Send + Sync>;
type ClockFn = Arc<dyn Fn() -> u64 + Send + Sync>;

const NONCE_LEN: usize = 32;

/// RFC 5849 `HMAC-SHA1` signer.
#[derive(Clone)]
pub struct HmacSha1Signer {
    credentials: Credentials,
    nonce: NonceFn,
    clock: ClockFn,
}

impl fmt::Debug for HmacSha1Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacSha1Signer")
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl HmacSha1Signer {
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            nonce: Arc::new(random_nonce),
            clock: Arc::new(unix_now),
        }
    }

    /// Replace the nonce generator.
    #[must_use]
    pub fn nonce_source<F>(mut self, nonce: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.nonce = Arc::new(nonce);
        self
    }

    /// Replace the clock (seconds since the Unix epoch).
    #[must_use]
    pub fn clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> u64 + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    fn protocol_params(&self, req: &SigningRequest<'_>) -> Vec<(String, String)> {
        let mut params = vec![
            ("oauth_consumer_key".to_owned(), self.credentials.key().to_owned()),
            ("oauth_nonce".to_owned(), (self.nonce)()),
            ("oauth_signature_method".to_owned(), "HMAC-SHA1".to_owned()),
            ("oauth_timestamp".to_owned(), (self.clock)().to_string()),
            ("oauth_version".to_owned(), "1.0".to_owned()),
        ];
        if let Some(token) = req.token {
            params.push(("oauth_token".to_owned(), token.token().to_owned()));
        }
        params.extend(req.protocol_params.iter().cloned());
        params
    }

    fn sign(&self, base: &str, req: &SigningRequest<'_>) -> Result<String, Error> {
        let token_secret = req.token.map(|t| t.secret().expose()).unwrap_or_default();
        let key = format!(
            "{}&{}",
            encode(self.credentials.secret().expose()),
            encode(token_secret)
        );
        let mut mac = HmacSha1::new_from_slice(key.as_bytes()).map_err(|_| Error::Signing {
            message: "invalid HMAC key".into(),
            source: None,
        })?;
        mac.update(base.as_bytes());
        Ok(B64.encode(mac.finalize().into_bytes()))
    }
}

impl Signer for HmacSha1Signer {
    fn authorization(&self, req: &SigningRequest<'_>) -> Result<HeaderValue, Error> {
        let mut protocol = self.protocol_params(req);
        let base = signature_base_string(req, &protocol);
        let signature = self.sign(&base, req)?;
        protocol.push(("oauth_signature".to_owned(), signature));
        protocol.sort();

        let fields = protocol
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
            .collect::<Vec<_>>()
            .join(", ");

        HeaderValue::from_str(&format!("OAuth {fields}")).map_err(|err| Error::Signing {
            message: "invalid Authorization header value".into(),
            source: Some(Box::new(err)),
        })
    }

    fn secrets(&self) -> Vec<&str> {
        vec![self.credentials.secret().expose()]
    }
}

/// RFC 3986 percent-encoding over the unreserved set, as OAuth1 requires.
fn encode(value: &str) -> Cow<'_, str> {
    urlencoding::encode(value)
}

/// Scheme, authority and path; no userinfo, query or fragment.
fn base_string_uri(url: &Url) -> String {
    let mut uri = url.clone();
    uri.set_query(None);
    uri.set_fragment(None);
    let _ = uri.set_username("");
    let _ = uri.set_password(None);
    uri.into()
}

pub(crate) fn signature_base_string(
    req: &SigningRequest<'_>,
    protocol: &[(String, String)],
) -> String {
    let url_query = req
        .url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect::<Vec<_>>();

    let mut params = url_query
        .iter()
        .chain(req.query)
        .chain(req.form)
        .chain(protocol.iter().filter(|(k, _)| k != "oauth_signature"))
        .map(|(k, v)| (encode(k).into_owned(), encode(v).into_owned()))
        .collect::<Vec<_>>();
    params.sort();

    let normalized = params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        req.method.as_str().to_ascii_uppercase(),
        encode(&base_string_uri(req.url)),
        encode(&normalized)
    )
}

fn random_nonce() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LEN)
        .map(char::from)
        .collect()
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}
