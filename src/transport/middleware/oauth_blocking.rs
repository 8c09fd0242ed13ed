//! OAuth1 signing middleware.

use crate::{
    Error,
    oauth::{DynSigner, SigningRequest},
    transport::{TransportRequest, TransportResponse, blocking_transport::BlockingTransport},
};
use http::header::AUTHORIZATION;

/// Blocking wrapper that signs each attempt with the configured [`crate::Signer`].
///
/// Requests without [`crate::transport::OAuthParams`] pass through untouched.
#[derive(Clone)]
pub struct OAuthBlocking<T> {
    inner: T,
    signer: DynSigner,
}

impl<T> OAuthBlocking<T> {
    pub fn new(inner: T, signer: DynSigner) -> Self {
        Self { inner, signer }
    }
}

impl<T: BlockingTransport> BlockingTransport for OAuthBlocking<T> {
    fn send(&self, mut req: TransportRequest) -> Result<TransportResponse, Error> {
        if let Some(oauth) = req.oauth.take() {
            let value = self.signer.authorization(&SigningRequest {
                method: &req.method,
                url: &req.url,
                query: &req.query,
                form: &req.form,
                token: oauth.token.as_ref(),
                protocol_params: &oauth.protocol_params,
            })?;
            req.headers.insert(AUTHORIZATION, value);
        }

        self.inner.send(req)
    }
}
