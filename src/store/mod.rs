// Credential storage
// Synchronous key-value storage for the access token, refresh token and cached profile

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Named entries the client persists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CredentialKey {
    #[serde(rename = "accessToken")]
    AccessToken,
    #[serde(rename = "refreshToken")]
    RefreshToken,
    /// Cached user profile as JSON
    #[serde(rename = "user")]
    User,
}

impl CredentialKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialKey::AccessToken => "accessToken",
            CredentialKey::RefreshToken => "refreshToken",
            CredentialKey::User => "user",
        }
    }
}

/// Same-site policy recorded alongside each entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SameSite {
    #[default]
    Strict,
    Lax,
    None,
}

/// Write options for a credential entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetOptions {
    pub secure: bool,
    pub same_site: SameSite,
}

impl SetOptions {
    /// Policy used for every token write: secure, strict same-site
    pub fn strict() -> Self {
        Self {
            secure: true,
            same_site: SameSite::Strict,
        }
    }
}

impl Default for SetOptions {
    fn default() -> Self {
        Self::strict()
    }
}

/// Durable, synchronous credential storage
///
/// Values are opaque. Writers are not coordinated with each other: the last
/// write wins.
pub trait CredentialStore: Send + Sync {
    /// Read an entry
    fn get(&self, key: CredentialKey) -> Option<String>;

    /// Write an entry, replacing any previous value
    fn set(&self, key: CredentialKey, value: &str, options: SetOptions) -> Result<()>;

    /// Remove an entry; removing a missing entry is not an error
    fn clear(&self, key: CredentialKey) -> Result<()>;

    /// Remove both tokens and the cached profile
    fn clear_all(&self) -> Result<()> {
        self.clear(CredentialKey::AccessToken)?;
        self.clear(CredentialKey::RefreshToken)?;
        self.clear(CredentialKey::User)
    }
}
