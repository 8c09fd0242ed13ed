//! Mautic API services.
//!
//! Services are reached through accessors on the client:
//! - `BlockingClient::contacts()`
//! - `BlockingClient::campaigns()`

pub mod campaigns;
pub mod contacts;

pub use campaigns::*;
pub use contacts::*;

use crate::{BlockingClient, Error, transport::request::{Request, Response}};
use http::StatusCode;
use serde_json::Value;

/// Decode a write response body, falling back to `null` for bodies that are
/// empty or not JSON.
fn lenient_body(resp: &Response) -> Value {
    resp.json_value().unwrap_or(Value::Null)
}

/// Send a contact write and accept only 200/201.
fn send_write(
    client: &BlockingClient,
    req: Request,
    operation: &'static str,
    context: &'static str,
) -> Result<(StatusCode, Value), Error> {
    let resp = client.send_unchecked(&req, operation)?;
    if !matches!(resp.status, StatusCode::OK | StatusCode::CREATED) {
        return Err(Error::InvalidResponseCode {
            context,
            error: client.http_error(&req, &resp),
        });
    }
    Ok((resp.status, lenient_body(&resp)))
}
