use http::StatusCode;
use serde_json::Value;

/// Raw outcome of `POST /api/campaigns/<id>/contact/add/<contact>`.
///
/// Mautic answers `{"success": 1}` on success; nothing is validated here.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct CampaignEnrollment {
    pub status: StatusCode,
    /// Decoded JSON body, `Value::Null` when empty or not JSON.
    pub body: Value,
}

impl CampaignEnrollment {
    /// `true` when the status is 2xx and the body reports `success`.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success() && self.body.get("success").is_some_and(truthy)
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !matches!(s.trim(), "" | "0" | "false"),
        _ => false,
    }
}
