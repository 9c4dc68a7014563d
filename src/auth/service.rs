// Account endpoints: login, signup, password recovery, profile lookup

use reqwest::Method;
use std::sync::Arc;

use super::executor::AuthExecutor;
use super::types::{
    AuthTokens, EmailRequest, LoginRequest, LogoutRequest, RegisterRequest, ResetPasswordRequest,
    SignUpRequest, User,
};
use crate::error::ApiError;
use crate::http_client::MirimHttpClient;

/// Client for `/auth/*` and `/user`
#[derive(Clone)]
pub struct AuthService {
    http: MirimHttpClient,
    executor: Arc<AuthExecutor>,
}

impl AuthService {
    pub fn new(http: MirimHttpClient, executor: Arc<AuthExecutor>) -> Self {
        Self { http, executor }
    }

    /// Stop sharing a refresh that was started for an earlier session
    pub(crate) fn abandon_refresh(&self) {
        self.executor.reset();
    }

    /// Exchange nickname and password for a token pair
    ///
    /// Storing the tokens is the session's job.
    pub async fn login(&self, nickname: &str, password: &str) -> Result<AuthTokens, ApiError> {
        let request = self
            .http
            .request(Method::POST, "/auth/login")
            .json(&LoginRequest { nickname, password });
        let tokens: AuthTokens = self.http.send_json(request).await?;

        tracing::info!(nickname = nickname, "Logged in");
        Ok(tokens)
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<(), ApiError> {
        let request = self
            .http
            .request(Method::POST, "/auth/register")
            .json(request);
        self.http.send_unit(request).await
    }

    pub async fn sign_up(&self, request: &SignUpRequest) -> Result<(), ApiError> {
        let request = self.http.request(Method::POST, "/auth/signup").json(request);
        self.http.send_unit(request).await
    }

    /// Email a signup verification code
    pub async fn send_verification_code(&self, email: &str) -> Result<(), ApiError> {
        let request = self
            .http
            .request(Method::POST, "/auth/send-code")
            .json(&EmailRequest { email });
        self.http.send_unit(request).await
    }

    /// Email the nickname registered for an address
    pub async fn find_nickname(&self, email: &str) -> Result<(), ApiError> {
        let request = self
            .http
            .request(Method::POST, "/auth/find-nickname")
            .json(&EmailRequest { email });
        self.http.send_unit(request).await
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<(), ApiError> {
        let request = self
            .http
            .request(Method::POST, "/auth/request-password-reset")
            .json(&EmailRequest { email });
        self.http.send_unit(request).await
    }

    /// Check that a reset token from an email link is still usable
    pub async fn verify_reset_token(&self, token: &str) -> Result<(), ApiError> {
        let path = format!("/auth/verify-reset-token/{}", urlencoding::encode(token));
        let request = self.http.request(Method::GET, &path);
        self.http.send_unit(request).await
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), ApiError> {
        let request = self
            .http
            .request(Method::POST, "/auth/reset-password-with-token")
            .json(&ResetPasswordRequest {
                token,
                new_password,
            });
        self.http.send_unit(request).await
    }

    /// Fetch the authoritative profile of the logged-in user
    pub async fn current_user(&self) -> Result<User, ApiError> {
        self.executor
            .execute(|token| async move {
                let request = self.http.authorized(Method::GET, "/user", token.as_deref())?;
                self.http.send_json(request).await
            })
            .await
    }

    /// Tell the server the session is over
    ///
    /// Sent with the token the caller already holds: no refresh is attempted,
    /// since local credentials are about to be discarded anyway.
    pub async fn notify_logout(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<(), ApiError> {
        let request = self
            .http
            .authorized(Method::POST, "/auth/logout", Some(access_token))?
            .json(&LogoutRequest { refresh_token });
        self.http.send_unit(request).await
    }
}
