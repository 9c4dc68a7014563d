// Authentication types

use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};

/// Account profile as returned by `GET /user`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    pub nickname: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admission: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_graduated: Option<bool>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// Token pair issued by login
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// In-memory authentication state published to subscribers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub is_authenticated: bool,
    pub user: Option<User>,
}

impl SessionState {
    pub fn anonymous() -> Self {
        Self::default()
    }
}

/// Generation counter for the signed-in session
///
/// Login and logout each start a new generation. A refresh records the
/// generation it started in and applies its outcome only if that generation
/// is still current. The lock is held while the outcome is applied, so a
/// logout can never interleave with a refresh writing its tokens.
#[derive(Debug, Default)]
pub struct SessionEpoch {
    generation: Mutex<u64>,
}

impl SessionEpoch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        *self.lock()
    }

    /// Start a new generation and run `apply` before anyone can observe it
    pub fn advance<R>(&self, apply: impl FnOnce() -> R) -> R {
        let mut generation = self.lock();
        *generation += 1;
        apply()
    }

    /// Run `apply` only if `generation` is still the current one
    pub fn apply_if_current<R>(&self, generation: u64, apply: impl FnOnce() -> R) -> Option<R> {
        let current = self.lock();
        if *current != generation {
            return None;
        }
        Some(apply())
    }

    fn lock(&self) -> MutexGuard<'_, u64> {
        self.generation.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Login request
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub nickname: &'a str,
    pub password: &'a str,
}

/// Full registration request (`/auth/register`)
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub nickname: String,
    pub role: String,
    pub major: String,
    pub admission: String,
    pub generation: String,
}

/// Email-verified signup request (`/auth/signup`)
#[derive(Debug, Clone, Serialize)]
pub struct SignUpRequest {
    pub email: String,
    pub nickname: String,
    pub password: String,
    pub code: String,
}

/// Password reset using an emailed token
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest<'a> {
    pub token: &'a str,
    pub new_password: &'a str,
}

/// Request carrying only an email address
#[derive(Debug, Serialize)]
pub struct EmailRequest<'a> {
    pub email: &'a str,
}

/// Refresh request
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// Refresh response envelope
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<RefreshData>,
}

/// Token data from refresh response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshData {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Logout request
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<&'a str>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_epoch_discards_outcome_from_previous_generation() {
        let epoch = SessionEpoch::new();
        let started = epoch.current();

        assert_eq!(epoch.apply_if_current(started, || "applied"), Some("applied"));

        epoch.advance(|| ());
        assert_eq!(epoch.apply_if_current(started, || "applied"), None);
        assert_eq!(epoch.current(), started + 1);
    }

    #[test]
    fn test_user_from_server_json() {
        let user: User = serde_json::from_value(json!({
            "id": 3,
            "email": "dev@e-mirim.hs.kr",
            "nickname": "mirim",
            "role": "student",
            "major": "software",
            "isGraduated": false,
            "isActive": true,
            "isAdmin": false,
            "createdAt": "2025-03-01T00:00:00Z",
            "updatedAt": "2025-03-02T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(user.id, 3);
        assert_eq!(user.major.as_deref(), Some("software"));
        assert_eq!(user.generation, None);
        assert!(user.is_active);
        assert!(!user.is_admin);
    }

    #[test]
    fn test_refresh_request_wire_name() {
        let body = serde_json::to_value(RefreshRequest {
            refresh_token: "R",
        })
        .unwrap();
        assert_eq!(body, json!({"refreshToken": "R"}));
    }

    #[test]
    fn test_logout_request_omits_missing_token() {
        let body = serde_json::to_value(LogoutRequest {
            refresh_token: None,
        })
        .unwrap();
        assert_eq!(body, json!({}));
    }

    #[test]
    fn test_reset_password_wire_names() {
        let body = serde_json::to_value(ResetPasswordRequest {
            token: "t",
            new_password: "p",
        })
        .unwrap();
        assert_eq!(body, json!({"token": "t", "newPassword": "p"}));
    }
}
