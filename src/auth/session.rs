use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::service::AuthService;
use super::types::{SessionEpoch, SessionState, User};
use crate::error::ApiError;
use crate::store::{CredentialKey, CredentialStore, SetOptions};

/// Authentication state shared with the UI layer
///
/// Two states, anonymous and authenticated. `initialize` trusts a stored
/// access token without checking it, so right after startup the session can
/// claim to be authenticated with a token the server no longer accepts. The
/// first authenticated call corrects that through the executor: either the
/// refresh succeeds, or it is rejected and the session drops to anonymous.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn CredentialStore>,
    state: Arc<watch::Sender<SessionState>>,
    epoch: Arc<SessionEpoch>,
    auth: AuthService,
}

impl Session {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        state: Arc<watch::Sender<SessionState>>,
        epoch: Arc<SessionEpoch>,
        auth: AuthService,
    ) -> Self {
        Self {
            store,
            state,
            epoch,
            auth,
        }
    }

    /// Restore state from the credential store
    ///
    /// With a stored access token the session becomes authenticated at once
    /// and the profile is fetched in the background; the returned handle
    /// resolves when that fetch is done. Without one, nothing touches the
    /// network.
    pub fn initialize(&self) -> Option<JoinHandle<()>> {
        if self.store.get(CredentialKey::AccessToken).is_none() {
            tracing::debug!("No stored access token, session is anonymous");
            self.state.send_replace(SessionState::anonymous());
            return None;
        }

        let cached_user = self.cached_user();
        self.state.send_replace(SessionState {
            is_authenticated: true,
            user: cached_user,
        });
        tracing::info!("Restored session from stored access token");

        let session = self.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = session.refresh_user().await {
                tracing::warn!("Background profile fetch failed: {}", e);
            }
        }))
    }

    /// Record a successful login
    pub fn login(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
        user: Option<User>,
    ) -> Result<()> {
        self.auth.abandon_refresh();
        self.epoch.advance(|| {
            self.store
                .set(CredentialKey::AccessToken, access_token, SetOptions::strict())
                .context("Failed to store access token")?;
            if let Some(refresh_token) = refresh_token {
                self.store
                    .set(CredentialKey::RefreshToken, refresh_token, SetOptions::strict())
                    .context("Failed to store refresh token")?;
            }
            if let Some(ref user) = user {
                self.persist_user(user)?;
            }

            self.state.send_replace(SessionState {
                is_authenticated: true,
                user,
            });
            Ok(())
        })
    }

    /// End the session locally and tell the server, best effort
    ///
    /// Local credentials are cleared regardless of what the server says. The
    /// returned handle belongs to the server notification; callers may drop it.
    pub fn logout(&self) -> Result<Option<JoinHandle<()>>> {
        let access_token = self.store.get(CredentialKey::AccessToken);
        let refresh_token = self.store.get(CredentialKey::RefreshToken);

        self.auth.abandon_refresh();
        self.epoch.advance(|| {
            self.store
                .clear_all()
                .context("Failed to clear stored credentials")?;
            self.state.send_replace(SessionState::anonymous());
            anyhow::Ok(())
        })?;
        tracing::info!("Logged out");

        let notify = access_token.map(|access_token| {
            let auth = self.auth.clone();
            tokio::spawn(async move {
                if let Err(e) = auth
                    .notify_logout(&access_token, refresh_token.as_deref())
                    .await
                {
                    tracing::warn!("Server logout notification failed: {}", e);
                }
            })
        });

        Ok(notify)
    }

    /// Replace the cached profile
    pub fn set_user(&self, user: User) -> Result<()> {
        self.persist_user(&user)?;
        self.state.send_modify(|state| state.user = Some(user));
        Ok(())
    }

    /// Re-fetch the profile from the server
    ///
    /// On failure the previously cached profile stays in place.
    pub async fn refresh_user(&self) -> Result<User, ApiError> {
        let user = self.auth.current_user().await?;
        self.set_user(user.clone())?;
        Ok(user)
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receive every state change
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    fn cached_user(&self) -> Option<User> {
        let raw = self.store.get(CredentialKey::User)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!("Ignoring unreadable cached profile: {}", e);
                None
            }
        }
    }

    fn persist_user(&self, user: &User) -> Result<()> {
        let raw = serde_json::to_string(user).context("Failed to serialize profile")?;
        self.store
            .set(CredentialKey::User, &raw, SetOptions::strict())
            .context("Failed to store profile")
    }
}
