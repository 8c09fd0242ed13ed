use crate::{TransportErrorKind, transport::Replay};
use http::{HeaderMap, StatusCode};
use rand::Rng;
use std::time::{Duration, SystemTime};

/// Retry policy for API calls.
///
/// The OAuth1 handshake never goes through this layer. Which failures are
/// replayed depends on the [`Replay`] class of the operation.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: usize,
    /// Base delay used for exponential backoff (`base * 2^n`).
    pub base_delay: Duration,
    /// Maximum delay cap for exponential backoff.
    pub max_delay: Duration,
    /// Randomize each delay within `[0, cap]`.
    pub jitter: bool,
    /// Also replay [`Replay::Write`] operations. Off by default: a replayed
    /// `contacts/new` can create a duplicate contact.
    pub replay_writes: bool,
    /// Prefer the server-provided `Retry-After` header when present.
    pub respect_retry_after: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
            jitter: true,
            replay_writes: false,
            respect_retry_after: true,
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub fn new(max_retries: usize, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            ..Self::default()
        }
    }

    /// Retries allowed for an operation of class `replay`.
    pub(crate) fn budget(&self, replay: Replay) -> usize {
        match replay {
            Replay::Read => self.max_retries,
            Replay::Write if self.replay_writes => self.max_retries,
            Replay::Write | Replay::Never => 0,
        }
    }

    /// Delay before retry number `attempt` (1-based) when the server gave no hint.
    pub(crate) fn delay_for(&self, attempt: usize) -> Duration {
        let cap = backoff_delay(self, attempt);
        if self.jitter { jitter_delay(cap) } else { cap }
    }
}

impl Replay {
    /// A write is only sent again when the server refused it outright;
    /// 502/504 may come back after Mautic already stored the contact.
    pub(crate) fn retries_status(self, status: StatusCode) -> bool {
        match self {
            Self::Read => matches!(
                status,
                StatusCode::TOO_MANY_REQUESTS
                    | StatusCode::BAD_GATEWAY
                    | StatusCode::SERVICE_UNAVAILABLE
                    | StatusCode::GATEWAY_TIMEOUT
            ),
            Self::Write => matches!(
                status,
                StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE
            ),
            Self::Never => false,
        }
    }

    /// A timed-out write may have reached the server.
    pub(crate) fn retries_transport(self, kind: TransportErrorKind) -> bool {
        match self {
            Self::Read => matches!(
                kind,
                TransportErrorKind::Timeout | TransportErrorKind::Connect
            ),
            Self::Write => kind == TransportErrorKind::Connect,
            Self::Never => false,
        }
    }
}

pub(crate) fn backoff_delay(config: &RetryConfig, attempt: usize) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let exp = 2u32.saturating_pow((attempt - 1).min(31) as u32);
    let scaled = config.base_delay.saturating_mul(exp);
    scaled.min(config.max_delay)
}

pub(crate) fn parse_retry_after(headers: &HeaderMap, now: SystemTime) -> Option<Duration> {
    let value = headers.get(http::header::RETRY_AFTER)?;
    let text = value.to_str().ok()?.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(secs) = text.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let at = httpdate::parse_http_date(text).ok()?;
    let delay = at.duration_since(now).unwrap_or(Duration::ZERO);
    Some(delay)
}

/// Full jitter: uniform in `[0, cap]`.
pub(crate) fn jitter_delay(cap: Duration) -> Duration {
    let max_ms = cap.as_millis().min(u128::from(u64::MAX)) as u64;
    if max_ms == 0 {
        return cap;
    }
    Duration::from_millis(rand::rng().random_range(0..=max_ms))
}
