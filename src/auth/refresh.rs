// Token refresh logic

use reqwest::Method;
use std::sync::Arc;
use tokio::sync::watch;

use super::types::{RefreshRequest, RefreshResponse, SessionEpoch, SessionState};
use crate::error::{describe_transport_error, RefreshError};
use crate::http_client::MirimHttpClient;
use crate::store::{CredentialKey, CredentialStore, SetOptions};

/// Exchanges the stored refresh token for a new access token
///
/// Owns the cleanup policy: a rejected refresh clears every stored
/// credential and moves the session to anonymous; a transport failure leaves
/// everything as it was. The outcome only lands if no login or logout
/// happened while the request was out.
pub struct TokenRefresher {
    http: MirimHttpClient,
    store: Arc<dyn CredentialStore>,
    session: Arc<watch::Sender<SessionState>>,
    epoch: Arc<SessionEpoch>,
}

impl TokenRefresher {
    pub fn new(
        http: MirimHttpClient,
        store: Arc<dyn CredentialStore>,
        session: Arc<watch::Sender<SessionState>>,
        epoch: Arc<SessionEpoch>,
    ) -> Self {
        Self {
            http,
            store,
            session,
            epoch,
        }
    }

    /// Refresh the access token and store it
    pub async fn refresh(&self) -> Result<String, RefreshError> {
        tracing::info!("Refreshing access token...");

        let generation = self.epoch.current();
        let outcome = self.request_new_token().await;

        self.epoch
            .apply_if_current(generation, || self.apply(outcome))
            .unwrap_or_else(|| {
                tracing::info!("Session changed during refresh, discarding result");
                Err(RefreshError::Superseded)
            })
    }

    fn apply(
        &self,
        outcome: Result<(String, Option<String>), RefreshError>,
    ) -> Result<String, RefreshError> {
        match outcome {
            Ok((access_token, rotated_refresh_token)) => {
                if let Err(e) =
                    self.store
                        .set(CredentialKey::AccessToken, &access_token, SetOptions::strict())
                {
                    tracing::error!("Failed to store refreshed access token: {:#}", e);
                }
                if let Some(refresh_token) = rotated_refresh_token {
                    if let Err(e) = self.store.set(
                        CredentialKey::RefreshToken,
                        &refresh_token,
                        SetOptions::strict(),
                    ) {
                        tracing::error!("Failed to store rotated refresh token: {:#}", e);
                    }
                }

                self.session.send_modify(|state| state.is_authenticated = true);
                tracing::info!("Access token refreshed");
                Ok(access_token)
            }
            Err(e) if e.is_rejection() => {
                tracing::warn!("Refresh rejected, clearing stored credentials: {}", e);
                if let Err(clear_err) = self.store.clear_all() {
                    tracing::error!("Failed to clear credentials: {:#}", clear_err);
                }
                self.session.send_replace(SessionState::anonymous());
                Err(e)
            }
            Err(e) => {
                tracing::error!("Token refresh failed: {}", e);
                Err(e)
            }
        }
    }

    /// One round trip to `POST /auth/refresh`
    async fn request_new_token(&self) -> Result<(String, Option<String>), RefreshError> {
        let refresh_token = self
            .store
            .get(CredentialKey::RefreshToken)
            .ok_or(RefreshError::MissingRefreshToken)?;

        let response = self
            .http
            .request(Method::POST, "/auth/refresh")
            .json(&RefreshRequest {
                refresh_token: &refresh_token,
            })
            .send()
            .await
            .map_err(|e| RefreshError::Transport(describe_transport_error(&e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RefreshError::Transport(describe_transport_error(&e)))?;

        let parsed: Option<RefreshResponse> = serde_json::from_str(&body).ok();

        if !status.is_success() {
            let message = parsed
                .and_then(|p| p.message)
                .unwrap_or_else(|| status.to_string());
            return Err(RefreshError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let parsed = parsed.ok_or(RefreshError::MalformedResponse)?;

        // The envelope status must agree; some deployments answer 200 with an error body
        let envelope_status = parsed.status.unwrap_or(status.as_u16());
        if envelope_status != 200 {
            return Err(RefreshError::Rejected {
                status: envelope_status,
                message: parsed.message.unwrap_or_default(),
            });
        }

        let data = parsed.data.ok_or(RefreshError::MalformedResponse)?;
        match data.access_token {
            Some(token) if !token.is_empty() => Ok((token, data.refresh_token)),
            _ => Err(RefreshError::MalformedResponse),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn refresher_for(
        url: &str,
        store: &MemoryStore,
    ) -> (TokenRefresher, watch::Receiver<SessionState>) {
        let (tx, rx) = watch::channel(SessionState {
            is_authenticated: true,
            user: None,
        });
        let http = MirimHttpClient::new(url, 5, 5).unwrap();
        (
            TokenRefresher::new(
                http,
                Arc::new(store.clone()),
                Arc::new(tx),
                Arc::new(SessionEpoch::new()),
            ),
            rx,
        )
    }

    #[tokio::test]
    async fn test_refresh_success_stores_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/auth/refresh")
            .match_body(mockito::Matcher::Json(json!({"refreshToken": "R"})))
            .with_status(200)
            .with_body(json!({"status": 200, "data": {"accessToken": "NEW"}}).to_string())
            .expect(1)
            .create_async()
            .await;

        let store = MemoryStore::new();
        store
            .set(CredentialKey::AccessToken, "OLD", SetOptions::strict())
            .unwrap();
        store
            .set(CredentialKey::RefreshToken, "R", SetOptions::strict())
            .unwrap();
        let (refresher, rx) = refresher_for(&server.url(), &store);

        let token = refresher.refresh().await.unwrap();

        assert_eq!(token, "NEW");
        assert_eq!(store.get(CredentialKey::AccessToken), Some("NEW".to_string()));
        assert_eq!(store.get(CredentialKey::RefreshToken), Some("R".to_string()));
        assert_eq!(store.options(CredentialKey::AccessToken), Some(SetOptions::strict()));
        assert!(rx.borrow().is_authenticated);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_refresh_stores_rotated_refresh_token() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v1/auth/refresh")
            .with_status(200)
            .with_body(
                json!({"status": 200, "data": {"accessToken": "NEW", "refreshToken": "R2"}})
                    .to_string(),
            )
            .create_async()
            .await;

        let store = MemoryStore::new();
        store
            .set(CredentialKey::RefreshToken, "R", SetOptions::strict())
            .unwrap();
        let (refresher, _rx) = refresher_for(&server.url(), &store);

        refresher.refresh().await.unwrap();
        assert_eq!(store.get(CredentialKey::RefreshToken), Some("R2".to_string()));
    }

    #[tokio::test]
    async fn test_missing_refresh_token_makes_no_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/auth/refresh")
            .expect(0)
            .create_async()
            .await;

        let store = MemoryStore::new();
        store
            .set(CredentialKey::AccessToken, "OLD", SetOptions::strict())
            .unwrap();
        let (refresher, rx) = refresher_for(&server.url(), &store);

        let result = refresher.refresh().await;

        assert_eq!(result, Err(RefreshError::MissingRefreshToken));
        assert_eq!(store.get(CredentialKey::AccessToken), None);
        assert!(!rx.borrow().is_authenticated);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejection_clears_credentials() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v1/auth/refresh")
            .with_status(401)
            .with_body(json!({"status": 401, "message": "INVALID_REFRESH_TOKEN"}).to_string())
            .create_async()
            .await;

        let store = MemoryStore::new();
        store
            .set(CredentialKey::AccessToken, "OLD", SetOptions::strict())
            .unwrap();
        store
            .set(CredentialKey::RefreshToken, "R", SetOptions::strict())
            .unwrap();
        store
            .set(CredentialKey::User, "{}", SetOptions::strict())
            .unwrap();
        let (refresher, rx) = refresher_for(&server.url(), &store);

        let result = refresher.refresh().await;

        assert_eq!(
            result,
            Err(RefreshError::Rejected {
                status: 401,
                message: "INVALID_REFRESH_TOKEN".to_string()
            })
        );
        assert_eq!(store.get(CredentialKey::AccessToken), None);
        assert_eq!(store.get(CredentialKey::RefreshToken), None);
        assert_eq!(store.get(CredentialKey::User), None);
        assert_eq!(*rx.borrow(), SessionState::anonymous());
    }

    #[tokio::test]
    async fn test_error_envelope_with_http_200_is_rejection() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v1/auth/refresh")
            .with_status(200)
            .with_body(json!({"status": 403, "message": "REFRESH_TOKEN_REVOKED"}).to_string())
            .create_async()
            .await;

        let store = MemoryStore::new();
        store
            .set(CredentialKey::RefreshToken, "R", SetOptions::strict())
            .unwrap();
        let (refresher, _rx) = refresher_for(&server.url(), &store);

        assert!(matches!(
            refresher.refresh().await,
            Err(RefreshError::Rejected { status: 403, .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_access_token_in_body_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v1/auth/refresh")
            .with_status(200)
            .with_body(json!({"status": 200, "data": {}}).to_string())
            .create_async()
            .await;

        let store = MemoryStore::new();
        store
            .set(CredentialKey::RefreshToken, "R", SetOptions::strict())
            .unwrap();
        let (refresher, _rx) = refresher_for(&server.url(), &store);

        assert_eq!(
            refresher.refresh().await,
            Err(RefreshError::MalformedResponse)
        );
        assert_eq!(store.get(CredentialKey::RefreshToken), None);
    }

    #[tokio::test]
    async fn test_transport_failure_keeps_credentials() {
        let store = MemoryStore::new();
        store
            .set(CredentialKey::AccessToken, "OLD", SetOptions::strict())
            .unwrap();
        store
            .set(CredentialKey::RefreshToken, "R", SetOptions::strict())
            .unwrap();
        let (refresher, rx) = refresher_for("http://127.0.0.1:9", &store);

        let result = refresher.refresh().await;

        assert!(matches!(result, Err(RefreshError::Transport(_))));
        assert_eq!(store.get(CredentialKey::AccessToken), Some("OLD".to_string()));
        assert_eq!(store.get(CredentialKey::RefreshToken), Some("R".to_string()));
        assert!(rx.borrow().is_authenticated);
    }
}
