use crate::ErrorKind;
use http::{Method, StatusCode};
use std::time::Duration;

pub(crate) struct InFlightGuard {
    gauge: metrics::Gauge,
}

impl InFlightGuard {
    pub(crate) fn new() -> Self {
        let gauge = metrics::gauge!("mautic_sdk_inflight");
        gauge.increment(1.0);
        Self { gauge }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.gauge.decrement(1.0);
    }
}

fn status_class(status: StatusCode) -> &'static str {
    match status.as_u16() {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    }
}

fn error_kind_label(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::InvalidToken => "invalid_token",
        ErrorKind::InvalidState => "invalid_state",
        ErrorKind::InvalidResponseCode => "invalid_response_code",
        ErrorKind::BadHost => "bad_host",
        ErrorKind::Auth => "auth",
        ErrorKind::NotFound => "not_found",
        ErrorKind::Conflict => "conflict",
        ErrorKind::RateLimited => "rate_limited",
        ErrorKind::Api => "api",
        ErrorKind::Transport => "transport",
        ErrorKind::Decode => "decode",
        ErrorKind::Signing => "signing",
        ErrorKind::InvalidConfig => "invalid_config",
    }
}

fn method_label(method: &Method) -> metrics::SharedString {
    match *method {
        Method::GET => "GET".into(),
        Method::POST => "POST".into(),
        Method::PATCH => "PATCH".into(),
        Method::PUT => "PUT".into(),
        Method::DELETE => "DELETE".into(),
        _ => method.to_string().into(),
    }
}

/// `operation` is a fixed label such as `contacts.create` or `oauth.access_token`.
pub(crate) fn record_outcome(
    method: &Method,
    operation: &'static str,
    status: Option<StatusCode>,
    latency: Duration,
    retries: usize,
    error_kind: Option<ErrorKind>,
) {
    let method = method_label(method);
    let status_class = status.map(status_class).unwrap_or("transport");

    metrics::counter!(
        "mautic_sdk_requests_total",
        "method" => method.clone(),
        "operation" => operation,
        "status_class" => status_class
    )
    .increment(1);
    metrics::histogram!(
        "mautic_sdk_request_duration_seconds",
        "method" => method.clone(),
        "operation" => operation,
        "status_class" => status_class
    )
    .record(latency);

    if retries > 0 {
        metrics::counter!("mautic_sdk_retries_total", "operation" => operation)
            .increment(retries as u64);
    }

    if status == Some(StatusCode::TOO_MANY_REQUESTS) {
        metrics::counter!("mautic_sdk_rate_limited_total", "operation" => operation).increment(1);
    }

    if let Some(kind) = error_kind {
        metrics::counter!(
            "mautic_sdk_errors_total",
            "method" => method,
            "operation" => operation,
            "kind" => error_kind_label(kind)
        )
        .increment(1);
    }
}
