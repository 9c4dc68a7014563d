// OAuth client (registered application) types

use serde::{Deserialize, Serialize};

/// Application registered with the OAuth server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthClient {
    pub id: i64,
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    pub service_name: String,
    pub service_domain: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    pub scope: String,
    pub allowed_user_type: String,
    #[serde(default)]
    pub created_by: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOAuthClientRequest {
    pub service_name: String,
    pub service_domain: String,
    pub scope: String,
    pub redirect_uris: Vec<String>,
    pub allowed_user_type: String,
}

/// Partial update; unset fields are left unchanged on the server
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOAuthClientRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uris: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_user_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSecret {
    pub client_secret: String,
}
