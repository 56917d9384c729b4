//! Authentication module for credentials and session state.
//!
//! This module provides:
//! - `CredentialStore`: persistent token storage (OS keychain or memory)
//! - `Session`: the signed-in user, kept in step with the stored token

pub mod credentials;
pub mod session;

pub use credentials::{
    CredentialStore, KeyringStore, MemoryStore, StorageError, StorageResult, TOKEN_KEY,
};
pub use session::{Session, SessionEvent, SessionState, SessionStatus};
