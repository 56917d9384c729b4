//! REST API client module for the nkap platform.
//!
//! `ApiClient` attaches the stored bearer token to every request and reacts
//! to 401/403 by clearing it and notifying the application. Responses follow
//! the `{ success, message, ... }` envelope in `envelope`.

pub mod client;
pub mod endpoints;
pub mod envelope;
pub mod error;

pub use client::{
    ApiClient, ClientConfig, RequestOptions, RetryPolicy, UnauthorizedHandler, NO_BODY,
};
pub use endpoints::UPLOAD_IMAGE_PATH;
pub use envelope::{Ack, ApiResponse, Data, Envelope};
pub use error::ApiError;
