use anyhow::{Context, Result};
use reqwest::{header, Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::error::{describe_transport_error, ApiError};

/// Message the server puts in the body when the bearer token has expired
pub const TOKEN_EXPIRED_MESSAGE: &str = "TOKEN_EXPIRED";

/// Prefix of every API route
const API_PREFIX: &str = "/api/v1";

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Response envelope shared by every Mirim endpoint
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub time_stamp: Option<String>,
}

impl Envelope {
    /// Deserialize `data`, failing if it is absent
    pub fn into_data<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        let data = self
            .data
            .ok_or_else(|| ApiError::InvalidResponse("response has no data field".to_string()))?;
        serde_json::from_value(data)
            .map_err(|e| ApiError::InvalidResponse(format!("unexpected data shape: {}", e)))
    }
}

/// HTTP client for the Mirim API
///
/// This is the only place that looks at raw responses: it decides whether a
/// response is a success, an expired token or an ordinary failure.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct MirimHttpClient {
    client: Client,
    base_url: String,
}

impl MirimHttpClient {
    /// Create a new HTTP client
    pub fn new(base_url: &str, connect_timeout: u64, request_timeout: u64) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout))
            .timeout(Duration::from_secs(request_timeout))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Full URL for an API path such as `/auth/refresh`
    pub fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    /// Start an unauthenticated request
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .header(header::CONTENT_TYPE, "application/json")
    }

    /// Start a bearer-authenticated request
    ///
    /// A missing token is reported as [`ApiError::TokenExpired`] so the
    /// executor gets a chance to obtain one from the refresh token.
    pub fn authorized(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
    ) -> Result<RequestBuilder, ApiError> {
        let token = token.ok_or(ApiError::TokenExpired)?;
        Ok(self.request(method, path).bearer_auth(token))
    }

    /// Start a request that carries the bearer token only when one is known
    pub fn optionally_authorized(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
    ) -> RequestBuilder {
        let builder = self.request(method, path);
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request and classify the response envelope
    pub async fn send(&self, builder: RequestBuilder) -> Result<Envelope, ApiError> {
        let request = builder.build().map_err(ApiError::from)?;
        let method = request.method().clone();
        let url = request.url().clone();

        tracing::debug!(method = %method, url = %url, "Sending HTTP request");

        let response = match self.client.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                let description = describe_transport_error(&e);
                tracing::error!(
                    method = %method,
                    url = %url,
                    error = %description,
                    "HTTP request error"
                );
                return Err(ApiError::Network(description));
            }
        };

        let status = response.status().as_u16();
        let body = response.text().await?;

        tracing::debug!(status = status, url = %url, "Received HTTP response");

        classify(status, &body)
    }

    /// Send a request and return its `data` payload
    pub async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        self.send(builder).await?.into_data()
    }

    /// Send a request whose payload does not matter
    pub async fn send_unit(&self, builder: RequestBuilder) -> Result<(), ApiError> {
        self.send(builder).await.map(|_| ())
    }

    /// Get the underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Decide what a response means
///
/// `message == "TOKEN_EXPIRED"` is the only expiry signal, whatever the HTTP
/// status. Everything else outside 2xx is an ordinary API error.
pub fn classify(status: u16, body: &str) -> Result<Envelope, ApiError> {
    let success = (200..300).contains(&status);

    let envelope = if body.trim().is_empty() {
        Envelope::default()
    } else {
        match serde_json::from_str::<Envelope>(body) {
            Ok(envelope) => envelope,
            Err(e) if success => {
                return Err(ApiError::InvalidResponse(format!(
                    "response body is not a JSON envelope: {}",
                    e
                )));
            }
            Err(_) => {
                return Err(ApiError::Api {
                    status,
                    message: truncate_body(body),
                });
            }
        }
    };

    if envelope.message.as_deref() == Some(TOKEN_EXPIRED_MESSAGE) {
        tracing::debug!(status = status, "Server reported expired access token");
        return Err(ApiError::TokenExpired);
    }

    if !success {
        let message = envelope
            .message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("request failed with status {}", status));
        return Err(ApiError::Api { status, message });
    }

    Ok(envelope)
}

/// Truncate a response body to avoid logging excessive data
fn truncate_body(body: &str) -> String {
    if body.chars().count() <= MAX_ERROR_BODY_LENGTH {
        body.to_string()
    } else {
        let head: String = body.chars().take(MAX_ERROR_BODY_LENGTH).collect();
        format!("{}... (truncated, {} total bytes)", head, body.len())
    }
}
