// Administrator user management

use reqwest::Method;
use std::sync::Arc;

use crate::auth::{AuthExecutor, User};
use crate::error::ApiError;
use crate::http_client::MirimHttpClient;
use crate::models::profile::AdminUpdateUserRequest;

/// Client for `/admin/users`; the server rejects non-admin tokens
#[derive(Clone)]
pub struct AdminService {
    http: MirimHttpClient,
    executor: Arc<AuthExecutor>,
}

impl AdminService {
    pub fn new(http: MirimHttpClient, executor: Arc<AuthExecutor>) -> Self {
        Self { http, executor }
    }

    pub async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        self.executor
            .execute(|token| async move {
                let request = self
                    .http
                    .authorized(Method::GET, "/admin/users", token.as_deref())?;
                self.http.send_json(request).await
            })
            .await
    }

    pub async fn get_user(&self, id: i64) -> Result<User, ApiError> {
        let path = format!("/admin/users/{}", id);
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

    pub async fn update_user(
        &self,
        id: i64,
        changes: &AdminUpdateUserRequest,
    ) -> Result<User, ApiError> {
        let path = format!("/admin/users/{}", id);
        self.executor
            .execute(|token| {
                let path = &path;
                async move {
                    let request = self
                        .http
                        .authorized(Method::PUT, path, token.as_deref())?
                        .json(changes);
                    self.http.send_json(request).await
                }
            })
            .await
    }

    pub async fn delete_user(&self, id: i64) -> Result<(), ApiError> {
        let path = format!("/admin/users/{}", id);
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
}
