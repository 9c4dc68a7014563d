use futures::future::{BoxFuture, FutureExt, Shared};
use std::future::Future;
use std::sync::{Arc, Mutex};

use super::refresh::TokenRefresher;
use crate::error::{ApiError, RefreshError};
use crate::store::{CredentialKey, CredentialStore};

type InFlightRefresh = Shared<BoxFuture<'static, Result<String, RefreshError>>>;

/// Authenticated call executor
///
/// Runs a bearer-token call with the stored access token and recovers from
/// exactly one failure class: an expired token. On expiry it refreshes once
/// and retries once. Concurrent callers that hit expiry at the same time share
/// a single refresh request.
pub struct AuthExecutor {
    store: Arc<dyn CredentialStore>,
    refresher: Arc<TokenRefresher>,

    /// Refresh currently running, if any. Never held across an await.
    in_flight: Mutex<Option<InFlightRefresh>>,
}

impl AuthExecutor {
    pub fn new(store: Arc<dyn CredentialStore>, refresher: Arc<TokenRefresher>) -> Self {
        Self {
            store,
            refresher,
            in_flight: Mutex::new(None),
        }
    }

    /// Execute `callback` with the current access token, refreshing and
    /// retrying once if it reports [`ApiError::TokenExpired`]
    ///
    /// The retried call's result is returned as-is, including a second
    /// `TokenExpired`. A refresh that the server rejects surfaces as
    /// [`ApiError::AuthRequired`]; one that never reached the server surfaces
    /// as [`ApiError::Network`].
    pub async fn execute<T, F, Fut>(&self, mut callback: F) -> Result<T, ApiError>
    where
        F: FnMut(Option<String>) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let token = self.store.get(CredentialKey::AccessToken);

        match callback(token.clone()).await {
            Err(ApiError::TokenExpired) => {}
            other => return other,
        }

        tracing::warn!("Access token expired, refreshing before retry");

        // Another caller may have refreshed while our first attempt was in flight
        let current = self.store.get(CredentialKey::AccessToken);
        let new_token = match current {
            Some(current) if token.as_deref() != Some(current.as_str()) => {
                tracing::debug!("Access token changed since first attempt, retrying with it");
                current
            }
            _ => self.refresh().await.map_err(|e| match e {
                RefreshError::Transport(message) => ApiError::Network(message),
                rejected => ApiError::AuthRequired(rejected),
            })?,
        };

        tracing::debug!("Retrying call with refreshed access token");
        callback(Some(new_token)).await
    }

    /// Refresh the access token, joining a refresh that is already running
    pub async fn refresh(&self) -> Result<String, RefreshError> {
        let refresh = {
            let mut slot = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            match slot.as_ref() {
                Some(pending) if pending.peek().is_none() => {
                    tracing::debug!("Joining in-flight token refresh");
                    pending.clone()
                }
                _ => {
                    let refresher = Arc::clone(&self.refresher);
                    let refresh = async move { refresher.refresh().await }.boxed().shared();
                    *slot = Some(refresh.clone());
                    refresh
                }
            }
        };

        refresh.await
    }

    /// Drop any finished or abandoned refresh
    pub fn reset(&self) {
        let mut slot = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        *slot = None;
    }
}
