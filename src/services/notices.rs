// Notice board

use reqwest::Method;
use std::sync::Arc;

use crate::auth::AuthExecutor;
use crate::error::ApiError;
use crate::http_client::MirimHttpClient;
use crate::models::notice::{CreateNoticeRequest, Notice, UpdateNoticeRequest};

/// Client for `/notice`
///
/// Reading is open to anonymous users; the token, when present, lets admins
/// see inactive notices too.
#[derive(Clone)]
pub struct NoticeService {
    http: MirimHttpClient,
    executor: Arc<AuthExecutor>,
}

impl NoticeService {
    pub fn new(http: MirimHttpClient, executor: Arc<AuthExecutor>) -> Self {
        Self { http, executor }
    }

    pub async fn list(&self, include_inactive: bool) -> Result<Vec<Notice>, ApiError> {
        let path = format!("/notice?includeInactive={}", include_inactive);
        self.executor
            .execute(|token| {
                let path = &path;
                async move {
                    let request =
                        self.http
                            .optionally_authorized(Method::GET, path, token.as_deref());
                    self.http.send_json(request).await
                }
            })
            .await
    }

    pub async fn get(&self, id: i64) -> Result<Notice, ApiError> {
        let path = format!("/notice/{}", id);
        self.executor
            .execute(|token| {
                let path = &path;
                async move {
                    let request =
                        self.http
                            .optionally_authorized(Method::GET, path, token.as_deref());
                    self.http.send_json(request).await
                }
            })
            .await
    }

    pub async fn create(&self, notice: &CreateNoticeRequest) -> Result<Notice, ApiError> {
        self.executor
            .execute(|token| async move {
                let request = self
                    .http
                    .authorized(Method::POST, "/notice", token.as_deref())?
                    .json(notice);
                self.http.send_json(request).await
            })
            .await
    }

    pub async fn update(&self, id: i64, notice: &UpdateNoticeRequest) -> Result<Notice, ApiError> {
        let path = format!("/notice/{}", id);
        self.executor
            .execute(|token| {
                let path = &path;
                async move {
                    let request = self
                        .http
                        .authorized(Method::PATCH, path, token.as_deref())?
                        .json(notice);
                    self.http.send_json(request).await
                }
            })
            .await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
        let path = format!("/notice/{}", id);
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
