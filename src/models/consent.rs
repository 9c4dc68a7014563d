// OAuth consent types

use serde::{Deserialize, Serialize};

/// Consent decision for an authorization request
///
/// Field names follow the OAuth query parameters, hence snake_case on the wire.
#[derive(Debug, Clone, Serialize)]
pub struct ConsentRequest {
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub state: Option<String>,
    pub approved: bool,
    pub scope: Option<String>,
}

/// Where to send the browser after consent
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConsentRedirect {
    pub url: String,
}

/// Public information about a client, shown on the consent screen
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    pub id: i64,
    pub client_id: String,
    pub service_name: String,
    pub service_domain: String,
    pub scope: String,
    pub allowed_user_type: String,
}
