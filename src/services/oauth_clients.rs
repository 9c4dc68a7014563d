// OAuth client registration and management

use reqwest::Method;
use std::sync::Arc;

use crate::auth::AuthExecutor;
use crate::error::ApiError;
use crate::http_client::MirimHttpClient;
use crate::models::oauth_client::{
    ClientSecret, CreateOAuthClientRequest, OAuthClient, UpdateOAuthClientRequest,
};

/// Client for `/oauth-client`
#[derive(Clone)]
pub struct OAuthClientService {
    http: MirimHttpClient,
    executor: Arc<AuthExecutor>,
}

impl OAuthClientService {
    pub fn new(http: MirimHttpClient, executor: Arc<AuthExecutor>) -> Self {
        Self { http, executor }
    }

    /// Applications owned by the current user
    pub async fn list(&self) -> Result<Vec<OAuthClient>, ApiError> {
        self.executor
            .execute(|token| async move {
                let request = self
                    .http
                    .authorized(Method::GET, "/oauth-client", token.as_deref())?;
                self.http.send_json(request).await
            })
            .await
    }

    pub async fn get(&self, id: i64) -> Result<OAuthClient, ApiError> {
        let path = format!("/oauth-client/{}", id);
        self.executor
            .execute(|token| {
                let path = &path;
                async move {
                    let request = self.http.authorized(Method::GET, path, token.as_deref())?;
                    self.http.send_json(request).await
                }
            })
            .await
    }

    pub async fn create(&self, client: &CreateOAuthClientRequest) -> Result<OAuthClient, ApiError> {
        self.executor
            .execute(|token| async move {
                let request = self
                    .http
                    .authorized(Method::POST, "/oauth-client", token.as_deref())?
                    .json(client);
                self.http.send_json(request).await
            })
            .await
    }

    pub async fn update(
        &self,
        id: i64,
        client: &UpdateOAuthClientRequest,
    ) -> Result<OAuthClient, ApiError> {
        let path = format!("/oauth-client/{}", id);
        self.executor
            .execute(|token| {
                let path = &path;
                async move {
                    let request = self
                        .http
                        .authorized(Method::PATCH, path, token.as_deref())?
                        .json(client);
                    self.http.send_json(request).await
                }
            })
            .await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
        let path = format!("/oauth-client/{}", id);
        self.executor
            .execute(|token| {
                let path = &path;
                async move {
                    let request = self.http.authorized(Method::DELETE, path, token.as_deref())?;
                    self.http.send_unit(request).await
                }
            })
            .await
    }

    /// Issue a new client secret; the old one stops working
    pub async fn regenerate_secret(&self, id: i64) -> Result<String, ApiError> {
        let path = format!("/oauth-client/{}/secret", id);
        let secret: ClientSecret = self
            .executor
            .execute(|token| {
                let path = &path;
                async move {
                    let request = self.http.authorized(Method::POST, path, token.as_deref())?;
                    self.http.send_json(request).await
                }
            })
            .await?;
        Ok(secret.client_secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AuthContext;
    use crate::store::{CredentialKey, CredentialStore, MemoryStore, SetOptions};
    use mockito::Matcher;
    use serde_json::json;

    fn logged_in_store() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .set(CredentialKey::AccessToken, "A", SetOptions::strict())
            .unwrap();
        store
            .set(CredentialKey::RefreshToken, "R", SetOptions::strict())
            .unwrap();
        store
    }

    fn client_json(id: i64) -> serde_json::Value {
        json!({
            "id": id,
            "clientId": format!("client-{}", id),
            "clientSecret": "secret",
            "serviceName": "Mirim Board",
            "serviceDomain": "https://board.e-mirim.hs.kr",
            "redirectUris": ["https://board.e-mirim.hs.kr/callback"],
            "scope": "profile",
            "allowedUserType": "student",
            "createdBy": 1
        })
    }

    #[tokio::test]
    async fn test_list_clients() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/oauth-client")
            .match_header("authorization", "Bearer A")
            .with_status(200)
            .with_body(json!({"status": 200, "data": [client_json(1), client_json(2)]}).to_string())
            .create_async()
            .await;

        let context = AuthContext::with_store(&server.url(), Arc::new(logged_in_store())).unwrap();
        let clients = context.oauth_clients().list().await.unwrap();

        assert_eq!(clients.len(), 2);
        assert_eq!(clients[1].client_id, "client-2");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_sends_patch_with_partial_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PATCH", "/api/v1/oauth-client/3")
            .match_body(Matcher::Json(json!({"scope": "profile email"})))
            .with_status(200)
            .with_body(json!({"status": 200, "data": client_json(3)}).to_string())
            .create_async()
            .await;

        let context = AuthContext::with_store(&server.url(), Arc::new(logged_in_store())).unwrap();
        let update = UpdateOAuthClientRequest {
            scope: Some("profile email".to_string()),
            ..Default::default()
        };
        let updated = context.oauth_clients().update(3, &update).await.unwrap();

        assert_eq!(updated.id, 3);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_regenerate_secret_after_refresh() {
        let mut server = mockito::Server::new_async().await;
        let expired = server
            .mock("POST", "/api/v1/oauth-client/5/secret")
            .match_header("authorization", "Bearer A")
            .with_status(401)
            .with_body(json!({"status": 401, "message": "TOKEN_EXPIRED"}).to_string())
            .create_async()
            .await;
        let _refresh = server
            .mock("POST", "/api/v1/auth/refresh")
            .with_status(200)
            .with_body(json!({"status": 200, "data": {"accessToken": "B"}}).to_string())
            .create_async()
            .await;
        let secret = server
            .mock("POST", "/api/v1/oauth-client/5/secret")
            .match_header("authorization", "Bearer B")
            .with_status(200)
            .with_body(json!({"status": 200, "data": {"clientSecret": "fresh"}}).to_string())
            .create_async()
            .await;

        let context = AuthContext::with_store(&server.url(), Arc::new(logged_in_store())).unwrap();
        let value = context.oauth_clients().regenerate_secret(5).await.unwrap();

        assert_eq!(value, "fresh");
        expired.assert_async().await;
        secret.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_business_error_passes_through() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("DELETE", "/api/v1/oauth-client/9")
            .with_status(404)
            .with_body(json!({"status": 404, "message": "CLIENT_NOT_FOUND"}).to_string())
            .create_async()
            .await;

        let context = AuthContext::with_store(&server.url(), Arc::new(logged_in_store())).unwrap();
        match context.oauth_clients().delete(9).await {
            Err(ApiError::Api { status, message }) => {
                assert_eq!(status, 404);
                assert_eq!(message, "CLIENT_NOT_FOUND");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
