use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Access/refresh token pair as returned by the token endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Local receive time, used to turn `expires_in` into a wall-clock expiry
    #[serde(skip, default = "Utc::now")]
    pub obtained_at: DateTime<Utc>,
}

impl TokenSet {
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_in: None,
            token_type: None,
            scope: None,
            obtained_at: Utc::now(),
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_in
            .map(|secs| self.obtained_at + Duration::seconds(secs as i64))
    }
}

/// A freshly built authorization URL and the secrets tied to it
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: String,
    /// CSRF state echoed back on the redirect
    pub state: String,
    /// PKCE verifier sent with the code exchange
    pub pkce_verifier: String,
}

/// Which path produced the session's token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Cached,
    Interactive,
}

/// One entry of a drive folder listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DriveItem {
    pub name: String,
    #[serde(default)]
    pub size: u64,
}

/// Graph collection envelope (`{"value": [...]}`)
#[derive(Debug, Clone, Deserialize)]
pub struct DriveListing {
    #[serde(default)]
    pub value: Vec<DriveItem>,
}
