use std::collections::HashMap;
use std::sync::Mutex;

use keyring::Entry;
use thiserror::Error;
use tracing::debug;

/// Default keychain service name
pub const DEFAULT_SERVICE_NAME: &str = "nkap";

/// Storage key holding the bearer token.
pub const TOKEN_KEY: &str = "auth_token";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Keychain error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("Credential store lock poisoned")]
    Poisoned,
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Persistent string storage for secrets, addressed by key.
///
/// Implementations must serialize their own reads and writes. Deleting a key
/// that is not present is not an error. Calls may block (the OS keychain
/// talks to a system service); the client runs them on tokio's blocking
/// pool when sending requests.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove a value. Returns whether anything was removed.
    fn delete(&self, key: &str) -> StorageResult<bool>;

    fn has(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}

/// OS keychain storage, one entry per key under a fixed service name.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> StorageResult<Entry> {
        Ok(Entry::new(&self.service, key)?)
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE_NAME)
    }
}

impl CredentialStore for KeyringStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.entry(key)?.set_password(value)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        match self.entry(key)?.delete_credential() {
            Ok(()) => Ok(true),
            Err(keyring::Error::NoEntry) => {
                debug!(key, "Keychain entry already absent");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process storage. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a token, handy for tests.
    pub fn with_token(token: &str) -> Self {
        let store = Self::new();
        if let Ok(mut data) = store.data.lock() {
            data.insert(TOKEN_KEY.to_string(), token.to_string());
        }
        store
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let data = self.data.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(data.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut data = self.data.lock().map_err(|_| StorageError::Poisoned)?;
        data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        let mut data = self.data.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(data.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);

        store.set(TOKEN_KEY, "T1").unwrap();
        assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("T1"));
        assert!(store.has(TOKEN_KEY).unwrap());

        store.set(TOKEN_KEY, "T2").unwrap();
        assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("T2"));
    }

    #[test]
    fn test_delete_absent_key_is_not_an_error() {
        let store = MemoryStore::with_token("T1");
        assert!(store.delete(TOKEN_KEY).unwrap());
        assert!(!store.delete(TOKEN_KEY).unwrap());
        assert!(!store.has(TOKEN_KEY).unwrap());
    }
}
