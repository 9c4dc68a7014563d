// Profile editing and granted permissions

use reqwest::Method;
use std::sync::Arc;

use crate::auth::{AuthExecutor, User};
use crate::error::ApiError;
use crate::http_client::MirimHttpClient;
use crate::models::profile::{
    ConnectedApp, PermissionHistory, RevokedApplication, UpdateProfileRequest,
};

/// Client for `/user/profile`, `/user/applications` and `/user/permissions-history`
#[derive(Clone)]
pub struct ProfileService {
    http: MirimHttpClient,
    executor: Arc<AuthExecutor>,
}

impl ProfileService {
    pub fn new(http: MirimHttpClient, executor: Arc<AuthExecutor>) -> Self {
        Self { http, executor }
    }

    /// Returns the updated profile
    pub async fn update(&self, profile: &UpdateProfileRequest) -> Result<User, ApiError> {
        self.executor
            .execute(|token| async move {
                let request = self
                    .http
                    .authorized(Method::PUT, "/user/profile", token.as_deref())?
                    .json(profile);
                self.http.send_json(request).await
            })
            .await
    }

    /// Every application ever granted access, revoked ones included
    pub async fn connected_applications(&self) -> Result<Vec<ConnectedApp>, ApiError> {
        self.executor
            .execute(|token| async move {
                let request =
                    self.http
                        .authorized(Method::GET, "/user/applications", token.as_deref())?;
                self.http.send_json(request).await
            })
            .await
    }

    pub async fn revoke_application(&self, client_id: &str) -> Result<String, ApiError> {
        let path = format!("/user/applications/{}", urlencoding::encode(client_id));
        let revoked: RevokedApplication = self
            .executor
            .execute(|token| {
                let path = &path;
                async move {
                    let request = self.http.authorized(Method::DELETE, path, token.as_deref())?;
                    self.http.send_json(request).await
                }
            })
            .await?;

        tracing::info!(client_id = %revoked.client_id, "Revoked application access");
        Ok(revoked.client_id)
    }

    pub async fn permissions_history(&self) -> Result<Vec<PermissionHistory>, ApiError> {
        self.executor
            .execute(|token| async move {
                let request = self.http.authorized(
                    Method::GET,
                    "/user/permissions-history",
                    token.as_deref(),
                )?;
                self.http.send_json(request).await
            })
            .await
    }
}
