// In-memory credential store

use anyhow::Result;
use dashmap::DashMap;
use std::sync::Arc;

use super::{CredentialKey, CredentialStore, SetOptions};

/// Thread-safe credential store that lives for the lifetime of the process
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<DashMap<CredentialKey, (String, SetOptions)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options the entry was last written with
    pub fn options(&self, key: CredentialKey) -> Option<SetOptions> {
        self.entries.get(&key).map(|entry| entry.value().1)
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: CredentialKey) -> Option<String> {
        self.entries.get(&key).map(|entry| entry.value().0.clone())
    }

    fn set(&self, key: CredentialKey, value: &str, options: SetOptions) -> Result<()> {
        self.entries.insert(key, (value.to_string(), options));
        tracing::debug!(key = key.as_str(), "Stored credential");
        Ok(())
    }

    fn clear(&self, key: CredentialKey) -> Result<()> {
        if self.entries.remove(&key).is_some() {
            tracing::debug!(key = key.as_str(), "Cleared credential");
        }
        Ok(())
    }
}
