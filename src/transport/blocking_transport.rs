use super::{ResponseMeta, TransportBody, TransportRequest, TransportResponse};
use crate::error::{Error, TransportErrorKind};
use http::{HeaderMap, Method};
use std::{sync::Arc, time::Duration};
use ureq::{
    Agent, RequestBuilder,
    typestate::{WithBody, WithoutBody},
};

/// Trait implemented by any blocking HTTP layer.
pub trait BlockingTransport: Send + Sync + 'static {
    fn send(&self, req: TransportRequest) -> Result<TransportResponse, Error>;
}

pub type DynBlockingTransport = Arc<dyn BlockingTransport>;

impl<T: BlockingTransport + ?Sized> BlockingTransport for Arc<T> {
    fn send(&self, req: TransportRequest) -> Result<TransportResponse, Error> {
        (**self).send(req)
    }
}

/// Default blocking transport built on `ureq`.
#[derive(Clone)]
pub struct UreqBlocking {
    agent: Agent,
}

impl UreqBlocking {
    /// Construct a new transport.
    ///
    /// * `insecure` – accept invalid TLS certificates.
    /// * `ua` – User-Agent header.
    /// * `timeout` – per-request timeout.
    /// * `connect_timeout` – connection establishment timeout.
    /// * `read_timeout` – response body timeout.
    /// * `no_proxy` – ignore system proxy environment variables.
    pub fn try_new(
        insecure: bool,
        ua: &str,
        timeout: Duration,
        connect_timeout: Duration,
        read_timeout: Duration,
        no_proxy: bool,
    ) -> Result<Self, Error> {
        let mut builder = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .timeout_connect(Some(connect_timeout))
            .timeout_recv_body(Some(read_timeout))
            .user_agent(ua);

        if no_proxy {
            builder = builder.proxy(None);
        }

        if insecure {
            builder = builder.tls_config(
                ureq::tls::TlsConfig::builder()
                    .disable_verification(true)
                    .build(),
            );
        }

        Ok(Self {
            agent: Agent::new_with_config(builder.build()),
        })
    }
}

fn prepare<B>(
    mut req: RequestBuilder<B>,
    headers: &HeaderMap,
    timeout: Duration,
) -> RequestBuilder<B> {
    for (name, value) in headers.iter() {
        req = req.header(name, value);
    }
    req.config().timeout_global(Some(timeout)).build()
}

fn send_with_body(
    req: RequestBuilder<WithBody>,
    form: Vec<(String, String)>,
    body: Option<TransportBody>,
) -> Result<http::Response<ureq::Body>, ureq::Error> {
    if let Some(body) = body {
        let req = match body.content_type {
            Some(content_type) => req.header(http::header::CONTENT_TYPE, content_type),
            None => req,
        };
        req.send(body.bytes)
    } else if form.is_empty() {
        req.send_empty()
    } else {
        req.send_form(form)
    }
}

fn call(req: RequestBuilder<WithoutBody>) -> Result<http::Response<ureq::Body>, ureq::Error> {
    req.call()
}

impl BlockingTransport for UreqBlocking {
    fn send(&self, req: TransportRequest) -> Result<TransportResponse, Error> {
        let TransportRequest {
            method,
            mut url,
            headers,
            query,
            form,
            body,
            timeout,
            replay: _,
            oauth: _,
        } = req;
        let path = url.path().to_string().into_boxed_str();
        let method_for_error = method.clone();

        // Encoded by `url` so a literal `+` (a Mautic search operator) reaches
        // the server as `%2B` rather than a space.
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        let url = url.as_str();

        let map_err = |err: ureq::Error| {
            let kind = match &err {
                ureq::Error::Timeout(_) => TransportErrorKind::Timeout,
                ureq::Error::HostNotFound | ureq::Error::ConnectionFailed => {
                    TransportErrorKind::Connect
                }
                ureq::Error::Io(io) if io.kind() == std::io::ErrorKind::TimedOut => {
                    TransportErrorKind::Timeout
                }
                ureq::Error::Io(io)
                    if matches!(
                        io.kind(),
                        std::io::ErrorKind::ConnectionRefused
                            | std::io::ErrorKind::ConnectionReset
                            | std::io::ErrorKind::ConnectionAborted
                            | std::io::ErrorKind::NotConnected
                    ) =>
                {
                    TransportErrorKind::Connect
                }
                _ => TransportErrorKind::Other,
            };

            Error::Transport {
                method: method_for_error.clone(),
                path: path.clone(),
                kind,
                source: Box::new(err),
            }
        };

        let mut response = match method {
            Method::GET => call(prepare(self.agent.get(url), &headers, timeout)),
            Method::DELETE => call(prepare(self.agent.delete(url), &headers, timeout)),
            Method::HEAD => call(prepare(self.agent.head(url), &headers, timeout)),
            Method::POST => {
                send_with_body(prepare(self.agent.post(url), &headers, timeout), form, body)
            }
            Method::PUT => {
                send_with_body(prepare(self.agent.put(url), &headers, timeout), form, body)
            }
            Method::PATCH => {
                send_with_body(prepare(self.agent.patch(url), &headers, timeout), form, body)
            }
            other => {
                return Err(Error::InvalidConfig {
                    message: format!("unsupported HTTP method for blocking client: {other}")
                        .into_boxed_str(),
                    source: None,
                });
            }
        }
        .map_err(map_err)?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_vec()
            .map_err(map_err)?;

        Ok(TransportResponse {
            status,
            headers,
            body,
            meta: ResponseMeta::default(),
        })
    }
}
