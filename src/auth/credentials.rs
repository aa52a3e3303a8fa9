use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use keyring::Entry;
use tracing::warn;

use super::storage::{SessionStorage, SESSION_KEYS};

const SERVICE_NAME: &str = "turmas";

/// Session keys kept in the OS keychain, one entry per key.
///
/// Entries are created once per key and reused for the life of the storage.
pub struct KeyringStorage {
    service: String,
    entries: Mutex<HashMap<String, Arc<Entry>>>,
}

impl KeyringStorage {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    /// Use a separate keychain service, e.g. one per API host.
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entry(&self, key: &str) -> Result<Arc<Entry>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = entries.get(key) {
            return Ok(entry.clone());
        }
        let entry = Arc::new(Entry::new(&self.service, key).context("Failed to create keyring entry")?);
        entries.insert(key.to_string(), entry.clone());
        Ok(entry)
    }
}

impl Default for KeyringStorage {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `remove` for every key, returning the first failure once all keys
/// have been attempted.
fn remove_each(keys: &[&str], mut remove: impl FnMut(&str) -> Result<()>) -> Result<()> {
    let mut first_error = None;
    for &key in keys {
        if let Err(e) = remove(key) {
            warn!(key, error = %e, "Failed to remove session value");
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}

impl SessionStorage for KeyringStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve session value from keychain"),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .context("Failed to store session value in keychain")
    }

    fn remove(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete session value from keychain"),
        }
    }

    fn clear(&self) -> Result<()> {
        remove_each(&SESSION_KEYS, |key| self.remove(key))
    }
}
