use std::time::Duration;

use thiserror::Error;

use crate::auth::StorageError;

/// Fallback shown when the server gave no usable message.
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

/// Shown for any failure where no response was received.
pub const CONNECTIVITY_MESSAGE: &str = "Unable to reach the server. Check your connection.";

/// Shown when the server asks the client to slow down.
pub const RATE_LIMITED_MESSAGE: &str = "Too many requests. Please wait a moment and try again.";

/// Shown when the server rejected the stored credential.
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";

#[derive(Error, Debug)]
pub enum ApiError {
    /// No response was received (offline, DNS, refused connection).
    #[error("Unable to reach the server: {0}")]
    Connectivity(#[source] reqwest::Error),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The server answered 401 or 403. The stored credential has been cleared.
    #[error("Unauthorized ({status}): {message}")]
    Unauthorized { status: u16, message: String },

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    /// 2xx response whose envelope carried `success: false`.
    #[error("Request rejected: {message}")]
    Rejected { message: String },

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{message}")]
    Upload {
        message: String,
        #[source]
        cause: Option<Box<ApiError>>,
    },

    #[error("No file could be uploaded:\n{}", errors.join("\n"))]
    UploadBatch { errors: Vec<String> },

    #[error("Credential storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Pull the `message` field out of a JSON error body, if there is one.
    pub(crate) fn server_message(body: &str) -> Option<String> {
        let value: serde_json::Value = serde_json::from_str(body).ok()?;
        value
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = Self::server_message(body).unwrap_or_else(|| Self::truncate_body(body));
        match status.as_u16() {
            code @ (401 | 403) => ApiError::Unauthorized { status: code, message },
            429 => ApiError::RateLimited,
            code => ApiError::Http { status: code, message },
        }
    }

    /// Classify a transport error. `timeout` is the limit the request ran under.
    pub fn from_transport(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            ApiError::Timeout(timeout)
        } else if err.is_builder() {
            ApiError::InvalidRequest(err.to_string())
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Connectivity(err)
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        match self {
            ApiError::Unauthorized { .. } => true,
            ApiError::Upload { cause: Some(cause), .. } => cause.is_unauthorized(),
            _ => false,
        }
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            ApiError::Timeout(_) => true,
            ApiError::Upload { cause: Some(cause), .. } => cause.is_timeout(),
            _ => false,
        }
    }

    /// True when no response was received at all. Timeouts count.
    pub fn is_connectivity(&self) -> bool {
        match self {
            ApiError::Connectivity(_) | ApiError::Timeout(_) => true,
            ApiError::Upload { cause: Some(cause), .. } => cause.is_connectivity(),
            _ => false,
        }
    }

    /// HTTP status for errors that came with a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { status, .. } | ApiError::Http { status, .. } => Some(*status),
            ApiError::RateLimited => Some(429),
            ApiError::Upload { cause: Some(cause), .. } => cause.status(),
            _ => None,
        }
    }

    /// Whether a retry could plausibly succeed.
    pub(crate) fn is_transient(&self) -> bool {
        match self {
            ApiError::Connectivity(_) | ApiError::Timeout(_) | ApiError::RateLimited => true,
            ApiError::Http { status, .. } => (500..=599).contains(status),
            _ => false,
        }
    }

    /// Text suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Connectivity(_) | ApiError::Timeout(_) => CONNECTIVITY_MESSAGE.to_string(),
            // A failed login is a 401 too; prefer what the server said.
            ApiError::Unauthorized { message, .. } => {
                if message.is_empty() || message.starts_with('<') {
                    SESSION_EXPIRED_MESSAGE.to_string()
                } else {
                    message.clone()
                }
            }
            ApiError::RateLimited => RATE_LIMITED_MESSAGE.to_string(),
            ApiError::Http { message, .. } => {
                // HTML error pages are not worth showing
                if message.is_empty() || message.starts_with('<') {
                    GENERIC_FAILURE_MESSAGE.to_string()
                } else {
                    message.clone()
                }
            }
            ApiError::Rejected { message } | ApiError::Upload { message, .. } => {
                if message.is_empty() {
                    GENERIC_FAILURE_MESSAGE.to_string()
                } else {
                    message.clone()
                }
            }
            ApiError::UploadBatch { .. } => self.to_string(),
            ApiError::Decode(_) | ApiError::InvalidRequest(_) | ApiError::Storage(_) => {
                GENERIC_FAILURE_MESSAGE.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_auth_failures() {
        let err = ApiError::from_status(StatusCode::UNAUTHORIZED, r#"{"message":"Unauthenticated."}"#);
        assert!(err.is_unauthorized());
        assert_eq!(err.status(), Some(401));

        let err = ApiError::from_status(StatusCode::FORBIDDEN, "");
        assert!(err.is_unauthorized());
        assert_eq!(err.status(), Some(403));
    }

    #[test]
    fn test_from_status_keeps_server_message() {
        let err = ApiError::from_status(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"success":false,"message":"Solde insuffisant"}"#,
        );
        match &err {
            ApiError::Http { status, message } => {
                assert_eq!(*status, 422);
                assert_eq!(message, "Solde insuffisant");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(err.user_message(), "Solde insuffisant");
        assert!(!err.is_unauthorized());
        assert!(!err.is_connectivity());
    }

    #[test]
    fn test_unauthorized_user_message() {
        let err = ApiError::from_status(
            StatusCode::UNAUTHORIZED,
            r#"{"success":false,"message":"Identifiants incorrects"}"#,
        );
        assert_eq!(err.user_message(), "Identifiants incorrects");

        let err = ApiError::from_status(StatusCode::FORBIDDEN, "");
        assert_eq!(err.user_message(), SESSION_EXPIRED_MESSAGE);
    }

    #[test]
    fn test_too_many_requests_is_rate_limited() {
        let err = ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, r#"{"message":"Slow down"}"#);
        assert!(matches!(err, ApiError::RateLimited));
        assert_eq!(err.status(), Some(429));
        assert!(err.is_transient());
        assert!(!err.is_unauthorized());
        assert_eq!(err.user_message(), RATE_LIMITED_MESSAGE);

        let err = ApiError::from_status(StatusCode::BAD_REQUEST, "{}");
        assert!(!err.is_transient());
    }

    #[test]
    fn test_from_status_truncates_plain_body() {
        let body = "x".repeat(2000);
        match ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, &body) {
            ApiError::Http { message, .. } => {
                assert!(message.len() < 600);
                assert!(message.contains("2000 total bytes"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let body = "é".repeat(400);
        let truncated = ApiError::truncate_body(&body);
        assert!(truncated.contains("truncated"));
    }

    #[test]
    fn test_timeout_is_connectivity_class() {
        let err = ApiError::Timeout(Duration::from_secs(15));
        assert!(err.is_timeout());
        assert!(err.is_connectivity());
        assert!(!err.is_unauthorized());
        assert_eq!(err.user_message(), CONNECTIVITY_MESSAGE);
    }

    #[test]
    fn test_upload_error_exposes_cause() {
        let err = ApiError::Upload {
            message: CONNECTIVITY_MESSAGE.to_string(),
            cause: Some(Box::new(ApiError::Timeout(Duration::from_secs(30)))),
        };
        assert!(err.is_timeout());
        assert!(err.is_connectivity());
        assert_eq!(err.to_string(), CONNECTIVITY_MESSAGE);
    }

    #[test]
    fn test_upload_batch_lists_every_failure() {
        let err = ApiError::UploadBatch {
            errors: vec!["File 1: too large".to_string(), "File 2: bad type".to_string()],
        };
        let text = err.to_string();
        assert!(text.starts_with("No file could be uploaded"));
        assert!(text.contains("File 1: too large"));
        assert!(text.contains("File 2: bad type"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(ApiError::Http { status: 503, message: String::new() }.is_transient());
        assert!(ApiError::Http { status: 429, message: String::new() }.is_transient());
        assert!(!ApiError::Http { status: 422, message: String::new() }.is_transient());
        assert!(!ApiError::Unauthorized { status: 401, message: String::new() }.is_transient());
    }
}
