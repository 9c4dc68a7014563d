// JSON file credential store
// Persists credentials across process restarts

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{CredentialKey, CredentialStore, SetOptions};

/// One persisted entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredEntry {
    value: String,
    #[serde(flatten)]
    options: SetOptions,
    updated_at: DateTime<Utc>,
}

/// Credential store backed by a JSON file
///
/// Every mutation rewrites the whole file through a temporary sibling and a
/// rename, so readers never observe a half-written file.
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<HashMap<CredentialKey, StoredEntry>>,
}

impl FileStore {
    /// Open the store at `path`, loading existing entries if the file exists
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let entries = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read credential file: {}", path.display()))?;
            if contents.trim().is_empty() {
                HashMap::new()
            } else {
                serde_json::from_str(&contents).with_context(|| {
                    format!("Failed to parse credential file: {}", path.display())
                })?
            }
        } else {
            HashMap::new()
        };

        tracing::debug!(
            path = %path.display(),
            entries = entries.len(),
            "Opened credential file"
        );

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `change` to a copy of the entries and keep it only once it is on disk
    ///
    /// `change` returns whether it modified anything; unchanged maps are not
    /// written. Returns that flag.
    fn update(
        &self,
        change: impl FnOnce(&mut HashMap<CredentialKey, StoredEntry>) -> bool,
    ) -> Result<bool> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow!("Credential store lock poisoned"))?;

        let mut next = entries.clone();
        if !change(&mut next) {
            return Ok(false);
        }
        self.persist(&next)?;
        *entries = next;
        Ok(true)
    }

    fn persist(&self, entries: &HashMap<CredentialKey, StoredEntry>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create credential directory: {}", parent.display())
                })?;
            }
        }

        let contents = serde_json::to_string_pretty(entries)?;
        let tmp_path = self.path.with_extension("json.tmp");

        // create_new below must not inherit a leftover file
        if tmp_path.exists() {
            std::fs::remove_file(&tmp_path).with_context(|| {
                format!("Failed to remove stale temp file: {}", tmp_path.display())
            })?;
        }

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options
            .open(&tmp_path)
            .with_context(|| format!("Failed to create credential file: {}", tmp_path.display()))?;
        file.write_all(contents.as_bytes())
            .and_then(|_| file.sync_all())
            .with_context(|| format!("Failed to write credential file: {}", tmp_path.display()))?;
        drop(file);

        std::fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to replace credential file: {}", self.path.display()))?;

        Ok(())
    }
}

impl CredentialStore for FileStore {
    fn get(&self, key: CredentialKey) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(&key).map(|entry| entry.value.clone())
    }

    fn set(&self, key: CredentialKey, value: &str, options: SetOptions) -> Result<()> {
        self.update(|entries| {
            entries.insert(
                key,
                StoredEntry {
                    value: value.to_string(),
                    options,
                    updated_at: Utc::now(),
                },
            );
            true
        })?;

        tracing::debug!(key = key.as_str(), "Stored credential");
        Ok(())
    }

    fn clear(&self, key: CredentialKey) -> Result<()> {
        if self.update(|entries| entries.remove(&key).is_some())? {
            tracing::debug!(key = key.as_str(), "Cleared credential");
        }
        Ok(())
    }

    fn clear_all(&self) -> Result<()> {
        if self.update(|entries| {
            let had_entries = !entries.is_empty();
            entries.clear();
            had_entries
        })? {
            tracing::debug!("Cleared all credentials");
        }
        Ok(())
    }
}
