/// Microsoft identity platform (v2.0 endpoints) + Microsoft Graph
/// Authorization-code flow with PKCE for a confidential client
use async_trait::async_trait;
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge, RedirectUrl, Scope, TokenUrl,
};
use serde_json::Value;

use super::CloudProvider;
use crate::config::Config;
use crate::error::{AuthError, Result};
use crate::types::{AuthorizationRequest, TokenSet};

pub struct MicrosoftGraph {
    http: reqwest::Client,
    oauth: BasicClient,
    client_id: String,
    client_secret: ClientSecret,
    redirect_uri: String,
    scopes: Vec<String>,
    token_url: String,
    graph_url: String,
}

impl MicrosoftGraph {
    pub fn new(config: &Config) -> Result<Self> {
        let invalid = |what: &str, e: oauth2::url::ParseError| {
            AuthError::Config(format!("invalid {}: {}", what, e))
        };

        let client_secret = ClientSecret::new(config.client_secret.clone());
        let oauth = BasicClient::new(
            ClientId::new(config.client_id.clone()),
            Some(client_secret.clone()),
            AuthUrl::new(config.authorize_endpoint()).map_err(|e| invalid("authorize URL", e))?,
            Some(TokenUrl::new(config.token_endpoint()).map_err(|e| invalid("token URL", e))?),
        )
        .set_redirect_uri(
            RedirectUrl::new(config.redirect_uri.clone()).map_err(|e| invalid("redirect_uri", e))?,
        );

        Ok(Self {
            http: reqwest::Client::new(),
            oauth,
            client_id: config.client_id.clone(),
            client_secret,
            redirect_uri: config.redirect_uri.clone(),
            scopes: config.scopes.clone(),
            token_url: config.token_endpoint(),
            graph_url: config.graph_url.trim_end_matches('/').to_string(),
        })
    }

    fn scope_param(&self) -> String {
        self.scopes.join(" ")
    }

    async fn request_token(&self, grant: &[(&str, &str)]) -> Result<TokenSet> {
        let scope = self.scope_param();
        let mut params: Vec<(&str, &str)> = vec![
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.secret().as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("scope", scope.as_str()),
        ];
        params.extend_from_slice(grant);

        let res = self
            .http
            .post(&self.token_url)
            .header("Accept", "application/json")
            .form(&params)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let error_text = res.text().await?;
            return Err(AuthError::from_token_response(status.as_u16(), &error_text));
        }

        let token: TokenSet = res.json().await?;
        Ok(token)
    }
}

#[async_trait]
impl CloudProvider for MicrosoftGraph {
    fn authorization_request(&self) -> Result<AuthorizationRequest> {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let (url, state) = self
            .oauth
            .authorize_url(CsrfToken::new_random)
            .add_scopes(self.scopes.iter().cloned().map(Scope::new))
            .set_pkce_challenge(pkce_challenge)
            .url();

        Ok(AuthorizationRequest {
            url: url.to_string(),
            state: state.secret().clone(),
            pkce_verifier: pkce_verifier.secret().clone(),
        })
    }

    async fn exchange_code(&self, code: &str, pkce_verifier: &str) -> Result<TokenSet> {
        self.request_token(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("code_verifier", pkce_verifier),
        ])
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet> {
        self.request_token(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    async fn get_json(&self, path: &str, access_token: &str) -> Result<Value> {
        let url = format!("{}/{}", self.graph_url, path.trim_start_matches('/'));

        let res = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            return Err(AuthError::Api {
                path: path.to_string(),
                status: status.as_u16(),
                body: res.text().await?,
            });
        }

        Ok(res.json().await?)
    }
}
