//! The `{ success, message, ... }` envelope every endpoint answers with.
//!
//! Domain fields sit next to `success` at the top level, so the payload is
//! flattened out of the same object. A body that does not fit the expected
//! payload type is a decode error; there is no fallback to other shapes.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::ApiError;

fn default_success() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    /// Absent on some 2xx responses; the HTTP status already vouches for them.
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub payload: T,
}

impl<T> Envelope<T> {
    /// Unwrap the payload, turning `success: false` into `ApiError::Rejected`.
    pub fn into_result(self) -> Result<T, ApiError> {
        if self.success {
            Ok(self.payload)
        } else {
            Err(ApiError::Rejected {
                message: self.message.unwrap_or_default(),
            })
        }
    }
}

/// Payload for endpoints that only acknowledge.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ack {}

/// Payload nested under a `data` key.
#[derive(Debug, Clone, Deserialize)]
pub struct Data<T> {
    pub data: T,
}

/// A parsed HTTP response with a 2xx status.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

impl ApiResponse {
    /// Decode the body as an envelope without judging `success`.
    pub fn envelope<T: DeserializeOwned>(&self) -> Result<Envelope<T>, ApiError> {
        Envelope::<T>::deserialize(&self.body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Decode the payload, failing when the server reported `success: false`.
    pub fn into_payload<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        self.envelope::<T>()?.into_result()
    }

    pub fn message(&self) -> Option<&str> {
        self.body.get("message").and_then(|m| m.as_str())
    }
}
