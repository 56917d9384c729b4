//! Core library for nkap: a session-aware client for the nkap tontine,
//! wallet and marketplace API.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError, ClientConfig};
pub use auth::{CredentialStore, KeyringStore, MemoryStore, Session, SessionEvent, SessionStatus};
pub use config::Config;
