// Error handling module
// Defines the error taxonomy shared by the executor, the refresh operation and the services

use thiserror::Error;

/// Reasons the refresh operation could not produce a new access token
///
/// `Clone` because one refresh outcome is shared by every caller waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    /// Nothing to exchange
    #[error("no refresh token stored")]
    MissingRefreshToken,

    /// The server answered but refused the refresh token
    #[error("refresh token rejected: {status} - {message}")]
    Rejected { status: u16, message: String },

    /// The server answered 200 without an access token
    #[error("refresh response did not contain an access token")]
    MalformedResponse,

    /// The refresh request never got an answer
    #[error("refresh request failed: {0}")]
    Transport(String),

    /// A login or logout happened while the refresh was running
    #[error("session changed while refreshing")]
    Superseded,
}

impl RefreshError {
    /// True when the server has positively refused the credentials
    ///
    /// Transport failures say nothing about the refresh token, so stored
    /// credentials survive them. A superseded refresh belongs to a session
    /// that no longer exists.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, RefreshError::Transport(_) | RefreshError::Superseded)
    }
}

/// API errors that can occur while talking to the Mirim server
#[derive(Error, Debug)]
pub enum ApiError {
    /// The server reported the access token as expired
    #[error("Access token expired")]
    TokenExpired,

    /// Refresh failed; the user must log in again
    #[error("Authentication required: {0}")]
    AuthRequired(RefreshError),

    /// Non-authentication failure reported by the server
    #[error("Mirim API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Transport-level failure (DNS, connect, timeout, broken body)
    #[error("Network error: {0}")]
    Network(String),

    /// Response could not be understood
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Whether this error means the caller should send the user back to login
    pub fn requires_login(&self) -> bool {
        matches!(self, ApiError::AuthRequired(_) | ApiError::TokenExpired)
    }

    /// HTTP status attached to the error, if the server sent one
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } => Some(*status),
            ApiError::AuthRequired(RefreshError::Rejected { status, .. }) => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Network(describe_transport_error(&e))
    }
}

/// Categorize a reqwest error for logs and error messages
pub fn describe_transport_error(e: &reqwest::Error) -> String {
    let error_kind = if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connection_failed"
    } else if e.is_request() {
        "request_error"
    } else if e.is_body() {
        "body_error"
    } else if e.is_decode() {
        "decode_error"
    } else {
        "unknown"
    };

    format!("{} (kind: {})", e, error_kind)
}

/// Result type alias for API operations
pub type Result<T> = std::result::Result<T, ApiError>;
