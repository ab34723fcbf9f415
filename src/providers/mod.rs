pub mod microsoft;

pub use microsoft::MicrosoftGraph;

use crate::error::Result;
use crate::types::{AuthorizationRequest, TokenSet};
use async_trait::async_trait;
use serde_json::Value;

/// Identity provider plus the storage API it guards
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Build the browser URL for a new sign-in attempt
    fn authorization_request(&self) -> Result<AuthorizationRequest>;

    /// Redeem an authorization code
    async fn exchange_code(&self, code: &str, pkce_verifier: &str) -> Result<TokenSet>;

    /// Redeem a refresh token
    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet>;

    /// Authenticated GET against the storage API, `path` relative to its base URL
    async fn get_json(&self, path: &str, access_token: &str) -> Result<Value>;
}
