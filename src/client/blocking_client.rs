//! High-level blocking Mautic client.

use super::state::{AuthState, Session};
use crate::{
    AuthPhase, BodySnippetConfig, Credentials, Error, HttpError, TokenPair,
    api,
    oauth::{self, DynSigner, HmacSha1Signer, Signer},
    transport::{
        OAuthParams, Replay, TransportBody, TransportRequest,
        blocking_transport::{DynBlockingTransport, UreqBlocking},
        middleware::{OAuthBlocking, RetryBlocking, RetryConfig},
        request::{Request, Response},
    },
    util::{
        diagnostics,
        redact::redact_text,
        url::{endpoint_url, normalize_host, sanitize_url_for_error},
    },
};
use http::{HeaderMap, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};
use url::Url;

#[cfg(feature = "tracing")]
use tracing::{debug, field, info};

const DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Configures and constructs [`BlockingClient`].
pub struct BlockingClientBuilder {
    host: Url,
    credentials: Credentials,
    access_token: Option<String>,
    access_token_secret: Option<String>,
    callback: Option<String>,
    signer: Option<DynSigner>,
    insecure: bool,
    user_agent: String,
    timeout: Duration,
    connect_timeout: Duration,
    read_timeout: Duration,
    no_proxy: bool,
    retry: Option<RetryConfig>,
    default_headers: HeaderMap,
    body_snippet: BodySnippetConfig,
}

impl BlockingClientBuilder {
    fn try_new(
        host: impl AsRef<str>,
        key: impl Into<String>,
        secret: impl Into<String>,
    ) -> Result<Self, Error> {
        let host = normalize_host(host.as_ref())?;
        Ok(Self {
            host,
            credentials: Credentials::new(key, secret),
            access_token: None,
            access_token_secret: None,
            callback: None,
            signer: None,
            insecure: false,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            no_proxy: false,
            retry: None,
            default_headers: HeaderMap::new(),
            body_snippet: BodySnippetConfig::default(),
        })
    }

    /// Resume a prior authorization; the client starts with a session.
    pub fn access_token(mut self, token: impl Into<String>, secret: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self.access_token_secret = Some(secret.into());
        self
    }

    /// Like [`Self::access_token`] for values that may be absent, e.g. read
    /// from the environment. Supplying only one half makes `build` fail with
    /// [`Error::InvalidToken`].
    pub fn access_token_parts(mut self, token: Option<String>, secret: Option<String>) -> Self {
        self.access_token = token;
        self.access_token_secret = secret;
        self
    }

    /// `oauth_callback` sent with the request-token call.
    pub fn callback_url(mut self, url: impl Into<String>) -> Self {
        self.callback = Some(url.into());
        self
    }

    /// Replace the default HMAC-SHA1 signer.
    pub fn signer(mut self, signer: impl Signer) -> Self {
        self.signer = Some(Arc::new(signer));
        self
    }

    pub fn no_system_proxy(mut self) -> Self {
        self.no_proxy = true;
        self
    }

    pub fn danger_accept_invalid_certs(mut self, yes: bool) -> Self {
        self.insecure = yes;
        self
    }

    /// Override the default `User-Agent` header.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = ua.into();
        self
    }

    pub fn timeout(mut self, value: Duration) -> Self {
        self.timeout = value;
        self
    }

    pub fn connect_timeout(mut self, value: Duration) -> Self {
        self.connect_timeout = value;
        self
    }

    pub fn read_timeout(mut self, value: Duration) -> Self {
        self.read_timeout = value;
        self
    }

    pub fn default_header(
        mut self,
        name: http::header::HeaderName,
        value: http::HeaderValue,
    ) -> Self {
        self.default_headers.insert(name, value);
        self
    }

    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers.extend(headers);
        self
    }

    pub fn capture_body_snippet(mut self, enabled: bool) -> Self {
        self.body_snippet.enabled = enabled;
        self
    }

    pub fn max_body_snippet_bytes(mut self, max_bytes: usize) -> Self {
        self.body_snippet.max_bytes = max_bytes;
        self
    }

    /// Retry API calls; the authorization handshake is never retried.
    pub fn with_retry(mut self, max_retries: usize, base_delay: Duration) -> Self {
        self.retry = Some(RetryConfig::new(max_retries, base_delay));
        self
    }

    pub fn retry_config(mut self, config: RetryConfig) -> Self {
        self.retry = Some(config);
        self
    }

    pub fn build(self) -> Result<BlockingClient, Error> {
        let state = match (self.access_token, self.access_token_secret) {
            (Some(token), Some(secret)) => AuthState::Ready {
                session: Session::new(TokenPair::new(token, secret)),
            },
            (None, None) => AuthState::Unauthorized,
            (Some(_), None) => {
                return Err(Error::InvalidToken {
                    message: "access token secret is missing".into(),
                });
            }
            (None, Some(_)) => {
                return Err(Error::InvalidToken {
                    message: "access token is missing".into(),
                });
            }
        };

        let api_base = endpoint_url(&self.host, ["api", ""])?;
        let signer = self
            .signer
            .unwrap_or_else(|| Arc::new(HmacSha1Signer::new(self.credentials)));

        let transport: DynBlockingTransport = Arc::new(UreqBlocking::try_new(
            self.insecure,
            &self.user_agent,
            self.timeout,
            self.connect_timeout,
            self.read_timeout,
            self.no_proxy,
        )?);

        let handshake: DynBlockingTransport =
            Arc::new(OAuthBlocking::new(transport, signer.clone()));

        let api: DynBlockingTransport = match self.retry {
            Some(retry) => Arc::new(RetryBlocking::new(handshake.clone(), retry)),
            None => handshake.clone(),
        };

        #[cfg(feature = "tracing")]
        debug!(host = %self.host, phase = %state.phase(), "mautic client built");

        Ok(BlockingClient {
            inner: Arc::new(Inner {
                host: self.host,
                api_base,
                callback: self.callback,
                timeout: self.timeout,
                default_headers: self.default_headers,
                body_snippet: self.body_snippet,
                signer,
                api,
                handshake,
                state: Mutex::new(state),
            }),
        })
    }
}

/// Mautic API client.
///
/// Cheap to clone; clones share the authorization state, so a handshake
/// completed on one handle is visible to every service obtained from any of
/// them.
#[derive(Clone)]
pub struct BlockingClient {
    inner: Arc<Inner>,
}

struct Inner {
    host: Url,
    api_base: Url,
    callback: Option<String>,
    timeout: Duration,
    default_headers: HeaderMap,
    body_snippet: BodySnippetConfig,
    signer: DynSigner,
    /// Signed, with the optional retry layer.
    api: DynBlockingTransport,
    /// Signed, never retried.
    handshake: DynBlockingTransport,
    state: Mutex<AuthState>,
}

/// Which stack and base URL a request goes through.
#[derive(Clone, Copy)]
enum Channel {
    Handshake,
    Api,
}

impl BlockingClient {
    pub fn builder(
        host: impl AsRef<str>,
        key: impl Into<String>,
        secret: impl Into<String>,
    ) -> Result<BlockingClientBuilder, Error> {
        BlockingClientBuilder::try_new(host, key, secret)
    }

    /// Client without tokens, in [`AuthPhase::Unauthorized`].
    pub fn new(
        host: impl AsRef<str>,
        key: impl Into<String>,
        secret: impl Into<String>,
    ) -> Result<Self, Error> {
        Self::builder(host, key, secret)?.build()
    }

    #[must_use]
    pub fn host(&self) -> &Url {
        &self.inner.host
    }

    #[must_use]
    pub fn phase(&self) -> AuthPhase {
        self.state().phase()
    }

    #[must_use]
    pub fn has_session(&self) -> bool {
        self.state().session().is_some()
    }

    /// The access token pair, once known, so callers can persist it and
    /// resume later with [`BlockingClientBuilder::access_token`].
    #[must_use]
    pub fn access_token(&self) -> Option<TokenPair> {
        self.state().access_token().cloned()
    }

    #[must_use]
    pub fn contacts(&self) -> api::ContactsService {
        api::ContactsService::new(self.clone())
    }

    #[must_use]
    pub fn campaigns(&self) -> api::CampaignsService {
        api::CampaignsService::new(self.clone())
    }

    /// Step 1 of the handshake: obtain a request token and return the URL the
    /// user must visit to approve the application.
    ///
    /// `Unauthorized` → `AwaitingVerifier`.
    pub fn request_and_authorize(&self) -> Result<Url, Error> {
        const OP: &str = "request a token";
        self.state().expect(OP, AuthPhase::Unauthorized)?;

        let protocol_params = self
            .inner
            .callback
            .iter()
            .map(|cb| ("oauth_callback".to_owned(), cb.clone()))
            .collect();
        let req = Request::get(oauth::REQUEST_TOKEN_PATH);
        let resp = self.dispatch(
            Channel::Handshake,
            &req,
            OAuthParams {
                token: None,
                protocol_params,
            },
            "oauth.request_token",
        )?;
        let resp = self.ensure_success(&req, resp, None)?;
        let request_token = self.token_pair(&req, &resp, None)?;

        let mut authorize = endpoint_url(&self.inner.host, oauth::AUTHORIZE_PATH)?;
        authorize
            .query_pairs_mut()
            .append_pair("oauth_token", request_token.token());

        #[cfg(feature = "tracing")]
        info!(url = %authorize, "visit this URL to authorize the mautic client");

        // The lock is not held across the request; another handle may have
        // started its own handshake meanwhile.
        let mut state = self.state();
        state.expect(OP, AuthPhase::Unauthorized)?;
        *state = AuthState::AwaitingVerifier { request_token };
        Ok(authorize)
    }

    /// Step 2: exchange the request token and the user's verifier for an
    /// access token.
    ///
    /// `AwaitingVerifier` → `Authorized`. The request token is discarded.
    pub fn get_access_token(&self, verifier: impl Into<String>) -> Result<TokenPair, Error> {
        const OP: &str = "exchange the verifier";
        let request_token = self.request_token(OP)?;

        let req = Request::post(oauth::ACCESS_TOKEN_PATH)
            .form_pairs([("oauth_verifier", verifier.into())]);
        let resp = self.dispatch(
            Channel::Handshake,
            &req,
            OAuthParams {
                token: Some(request_token.clone()),
                protocol_params: Vec::new(),
            },
            "oauth.access_token",
        )?;
        let resp = self.ensure_success(&req, resp, Some(&request_token))?;
        let access_token = self.token_pair(&req, &resp, Some(&request_token))?;

        #[cfg(feature = "tracing")]
        debug!("mautic access token obtained");

        let mut state = self.state();
        if state.request_token() != Some(&request_token) {
            return Err(Error::InvalidState {
                operation: OP,
                expected: AuthPhase::AwaitingVerifier,
                actual: state.phase(),
            });
        }
        *state = AuthState::Authorized {
            access_token: access_token.clone(),
        };
        Ok(access_token)
    }

    /// Step 3: bind the access token as the session for API calls.
    ///
    /// `Authorized` → `Ready`.
    pub fn get_session(&self) -> Result<(), Error> {
        self.state().open_session()?;

        #[cfg(feature = "tracing")]
        debug!("mautic session ready");

        Ok(())
    }

    /// `POST /api/<segments>` with a JSON body.
    ///
    /// The status is returned as-is; an empty response body reads as `null`.
    pub fn post_json<I, S, T>(&self, segments: I, body: &T) -> Result<(StatusCode, Value), Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        T: Serialize + ?Sized,
    {
        let req = Request::post(segments).json(body)?;
        let resp = self.send_unchecked(&req, "post_json")?;
        let value = resp
            .json_value()
            .map_err(|source| self.decode_error(&req, &resp, Box::new(source)))?;
        Ok((resp.status, value))
    }

    pub(crate) fn send_json<T: DeserializeOwned>(
        &self,
        req: Request,
        operation: &'static str,
    ) -> Result<T, Error> {
        let resp = self.send_unchecked(&req, operation)?;
        let token = self.session_token(operation)?;
        let resp = self.ensure_success(&req, resp, Some(&token))?;
        self.decode(&req, &resp)
    }

    /// Send an API request without mapping the status to an error.
    pub(crate) fn send_unchecked(
        &self,
        req: &Request,
        operation: &'static str,
    ) -> Result<Response, Error> {
        let token = self.session_token(operation)?;
        self.dispatch(
            Channel::Api,
            req,
            OAuthParams {
                token: Some(token),
                protocol_params: Vec::new(),
            },
            operation,
        )
    }

    pub(crate) fn decode<T: DeserializeOwned>(
        &self,
        req: &Request,
        resp: &Response,
    ) -> Result<T, Error> {
        resp.json()
            .map_err(|source| self.decode_error(req, resp, Box::new(source)))
    }

    /// Describe `resp` for an error report, with secrets scrubbed.
    pub(crate) fn http_error(&self, req: &Request, resp: &Response) -> HttpError {
        let token = self.state().access_token().cloned();
        self.http_error_with(req, resp, token.as_ref())
    }

    fn state(&self) -> MutexGuard<'_, AuthState> {
        match self.inner.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn request_token(&self, operation: &'static str) -> Result<TokenPair, Error> {
        let state = self.state();
        state.expect(operation, AuthPhase::AwaitingVerifier)?;
        state.request_token().cloned().ok_or(Error::InvalidState {
            operation,
            expected: AuthPhase::AwaitingVerifier,
            actual: state.phase(),
        })
    }

    fn session_token(&self, operation: &'static str) -> Result<TokenPair, Error> {
        let state = self.state();
        state.expect(operation, AuthPhase::Ready)?;
        state
            .session()
            .map(|session| session.access_token().clone())
            .ok_or(Error::InvalidState {
                operation,
                expected: AuthPhase::Ready,
                actual: state.phase(),
            })
    }

    fn secrets<'a>(&'a self, token: Option<&'a TokenPair>) -> Vec<&'a str> {
        let mut secrets = self.inner.signer.secrets();
        if let Some(token) = token {
            secrets.push(token.secret().expose());
        }
        secrets
    }

    fn dispatch(
        &self,
        channel: Channel,
        req: &Request,
        oauth: OAuthParams,
        operation: &'static str,
    ) -> Result<Response, Error> {
        #[cfg(feature = "metrics")]
        let _inflight = crate::transport::metrics::InFlightGuard::new();
        #[cfg(not(feature = "metrics"))]
        let _ = operation;

        if req.body.is_some() && !req.form.is_empty() {
            return Err(Error::InvalidConfig {
                message: "request.body and request.form are mutually exclusive".into(),
                source: None,
            });
        }

        let (base, transport, replay) = match channel {
            Channel::Handshake => (&self.inner.host, &self.inner.handshake, Replay::Never),
            Channel::Api => (&self.inner.api_base, &self.inner.api, req.replay),
        };
        let url = endpoint_url(base, req.path())?;

        let mut headers = self.inner.default_headers.clone();
        headers.extend(req.headers.clone());

        let body = req.body.clone().map(|body| TransportBody {
            bytes: body.bytes,
            content_type: body.content_type,
        });

        #[cfg(any(feature = "tracing", feature = "metrics"))]
        let start = std::time::Instant::now();
        #[cfg(feature = "tracing")]
        let span = tracing::info_span!(
            "mautic.request",
            operation,
            http.method = %req.method,
            http.host = %self.inner.host.host_str().unwrap_or_default(),
            http.path = %url.path(),
            http.status = field::Empty,
            request_id = field::Empty,
            retries = field::Empty,
            latency_ms = field::Empty,
            error_kind = field::Empty,
        );
        #[cfg(feature = "tracing")]
        let _enter = span.enter();

        let timeout = req.timeout_override.unwrap_or(self.inner.timeout);
        let resp = match transport.send(TransportRequest {
            method: req.method.clone(),
            url: url.clone(),
            headers,
            query: req.query.clone(),
            form: req.form.clone(),
            body,
            timeout,
            replay,
            oauth: Some(oauth),
        }) {
            Ok(resp) => resp,
            Err(err) => {
                #[cfg(feature = "metrics")]
                crate::transport::metrics::record_outcome(
                    &req.method,
                    operation,
                    err.status(),
                    start.elapsed(),
                    0,
                    Some(err.kind()),
                );
                #[cfg(feature = "tracing")]
                {
                    span.record("error_kind", field::debug(err.kind()));
                    span.record("latency_ms", start.elapsed().as_millis() as i64);
                }
                return Err(err);
            }
        };

        #[cfg(feature = "tracing")]
        {
            span.record("http.status", resp.status.as_u16() as i64);
            span.record("retries", resp.meta.retries as i64);
            span.record("latency_ms", start.elapsed().as_millis() as i64);
            if let Some(rid) = diagnostics::request_id(&resp.headers) {
                span.record("request_id", field::display(rid));
            }
        }

        #[cfg(feature = "metrics")]
        crate::transport::metrics::record_outcome(
            &req.method,
            operation,
            Some(resp.status),
            start.elapsed(),
            resp.meta.retries,
            None,
        );

        Ok(Response {
            url,
            status: resp.status,
            headers: resp.headers,
            body: resp.body,
            retries: resp.meta.retries,
        })
    }

    /// Map 4xx/5xx to a typed error.
    fn ensure_success(
        &self,
        req: &Request,
        resp: Response,
        token: Option<&TokenPair>,
    ) -> Result<Response, Error> {
        if !(resp.status.is_client_error() || resp.status.is_server_error()) {
            return Ok(resp);
        }

        let retry_after = crate::transport::middleware::retry::parse_retry_after(
            &resp.headers,
            std::time::SystemTime::now(),
        );
        let err = Error::from_http(self.http_error_with(req, &resp, token), retry_after);

        #[cfg(feature = "tracing")]
        debug!(error_kind = ?err.kind(), status = resp.status.as_u16(), "mautic request failed");

        Err(err)
    }

    fn http_error_with(
        &self,
        req: &Request,
        resp: &Response,
        token: Option<&TokenPair>,
    ) -> HttpError {
        let secrets = self.secrets(token);
        let message = diagnostics::extract_message(&resp.body)
            .map(|msg| redact_text(msg.into(), &secrets).into_boxed_str());
        HttpError {
            status: resp.status,
            method: req.method.clone(),
            url: Box::new(sanitize_url_for_error(&resp.url)),
            message,
            request_id: diagnostics::request_id(&resp.headers),
            body_snippet: diagnostics::body_snippet(&resp.body, self.inner.body_snippet, &secrets),
        }
    }

    fn decode_error(
        &self,
        req: &Request,
        resp: &Response,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Error {
        let token = self.state().access_token().cloned();
        Error::Decode {
            status: resp.status,
            method: req.method.clone(),
            path: resp.url.path().to_string().into_boxed_str(),
            request_id: diagnostics::request_id(&resp.headers),
            body_snippet: diagnostics::body_snippet(
                &resp.body,
                self.inner.body_snippet,
                &self.secrets(token.as_ref()),
            ),
            source,
        }
    }

    /// Read `oauth_token` / `oauth_token_secret` from a handshake response.
    fn token_pair(
        &self,
        req: &Request,
        resp: &Response,
        token: Option<&TokenPair>,
    ) -> Result<TokenPair, Error> {
        oauth::parse_token_pair(&resp.body).ok_or_else(|| Error::Decode {
            status: resp.status,
            method: req.method.clone(),
            path: resp.url.path().to_string().into_boxed_str(),
            request_id: diagnostics::request_id(&resp.headers),
            body_snippet: diagnostics::body_snippet(
                &resp.body,
                self.inner.body_snippet,
                &self.secrets(token),
            ),
            source: "response lacks oauth_token/oauth_token_secret".into(),
        })
    }
}
