//! Retry layer (blocking).

use super::retry::{RetryConfig, parse_retry_after};
use crate::{
    Error,
    transport::{
        Replay, TransportRequest, TransportResponse,
        blocking_transport::{BlockingTransport, DynBlockingTransport},
    },
};
use std::thread::sleep;
use std::time::{Duration, SystemTime};

#[cfg(feature = "tracing")]
use tracing::debug;

/// Replays failed attempts according to the request's [`Replay`] class.
///
/// Sits above the signing layer, so each replay is signed afresh.
#[derive(Clone)]
pub struct RetryBlocking {
    inner: DynBlockingTransport,
    config: RetryConfig,
}

impl RetryBlocking {
    #[must_use]
    pub fn new(inner: DynBlockingTransport, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    /// How long to wait before the next attempt, or `None` to hand the
    /// outcome back to the caller.
    fn pause(
        &self,
        replay: Replay,
        outcome: &Result<TransportResponse, Error>,
        attempt: usize,
    ) -> Option<Duration> {
        match outcome {
            Ok(resp) if replay.retries_status(resp.status) => {
                let hinted = self
                    .config
                    .respect_retry_after
                    .then(|| parse_retry_after(&resp.headers, SystemTime::now()))
                    .flatten();
                Some(hinted.unwrap_or_else(|| self.config.delay_for(attempt)))
            }
            Err(Error::Transport { kind, .. }) if replay.retries_transport(*kind) => {
                Some(self.config.delay_for(attempt))
            }
            _ => None,
        }
    }
}

impl BlockingTransport for RetryBlocking {
    fn send(&self, req: TransportRequest) -> Result<TransportResponse, Error> {
        let budget = self.config.budget(req.replay);
        let mut retries = 0usize;

        loop {
            let outcome = self.inner.send(req.clone());
            let pause = (retries < budget)
                .then(|| self.pause(req.replay, &outcome, retries + 1))
                .flatten();

            let Some(delay) = pause else {
                return outcome.map(|mut resp| {
                    resp.meta.retries = resp.meta.retries.saturating_add(retries);
                    resp
                });
            };

            #[cfg(feature = "tracing")]
            debug!(replay = ?req.replay, attempt = retries + 1, ?delay, "replaying mautic request");

            if !delay.is_zero() {
                sleep(delay);
            }
            retries += 1;
        }
    }
}
