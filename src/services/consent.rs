// OAuth consent screen calls

use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;

use crate::auth::AuthExecutor;
use crate::error::ApiError;
use crate::http_client::MirimHttpClient;
use crate::models::consent::{ClientInfo, ConsentRedirect, ConsentRequest};

/// Client for the authorization consent flow
#[derive(Clone)]
pub struct ConsentService {
    http: MirimHttpClient,
    executor: Arc<AuthExecutor>,
}

impl ConsentService {
    pub fn new(http: MirimHttpClient, executor: Arc<AuthExecutor>) -> Self {
        Self { http, executor }
    }

    /// Client details to show the user before they decide
    pub async fn client_info(&self, client_id: &str) -> Result<ClientInfo, ApiError> {
        let path = format!("/oauth-client/{}", urlencoding::encode(client_id));
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

    /// Record the decision; returns the URL to redirect the browser to
    pub async fn submit(&self, consent: &ConsentRequest) -> Result<String, ApiError> {
        self.post_consent("/oauth/consent", consent).await
    }

    /// Approve a pending request that was already shown
    pub async fn approve(&self, consent: &ConsentRequest) -> Result<String, ApiError> {
        self.post_consent("/oauth/consent/approve", consent).await
    }

    /// Whether the user already granted `client_id`; the payload is passed through
    pub async fn application_status(&self, client_id: &str) -> Result<Value, ApiError> {
        let path = format!("/user/applications/{}/status", urlencoding::encode(client_id));
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

    async fn post_consent(&self, path: &str, consent: &ConsentRequest) -> Result<String, ApiError> {
        let redirect: ConsentRedirect = self
            .executor
            .execute(|token| async move {
                let request = self
                    .http
                    .authorized(Method::POST, path, token.as_deref())?
                    .json(consent);
                self.http.send_json(request).await
            })
            .await?;
        Ok(redirect.url)
    }
}
