/// Token acquisition: cached refresh token first, interactive sign-in as the fallback
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use super::browser::UrlOpener;
use super::redirect::{parse_redirect, RedirectListener};
use super::token_store::TokenStore;
use crate::error::{AuthError, Result};
use crate::providers::CloudProvider;
use crate::types::{AuthorizationRequest, TokenSet, TokenSource};

/// Outcome of [`Authenticator::authenticate`]
#[derive(Debug, Clone)]
pub struct Session {
    pub token: TokenSet,
    pub source: TokenSource,
}

pub struct Authenticator {
    provider: Arc<dyn CloudProvider>,
    listener: Box<dyn RedirectListener>,
    opener: Box<dyn UrlOpener>,
    store: TokenStore,
    redirect_timeout: Option<Duration>,
}

impl Authenticator {
    pub fn new(
        provider: Arc<dyn CloudProvider>,
        listener: Box<dyn RedirectListener>,
        opener: Box<dyn UrlOpener>,
        store: TokenStore,
        redirect_timeout: Option<Duration>,
    ) -> Self {
        Self {
            provider,
            listener,
            opener,
            store,
            redirect_timeout,
        }
    }

    /// Get a valid token, signing in interactively only if the cached one can't be redeemed
    pub async fn authenticate(&self) -> Result<Session> {
        let session = match self.try_cached_token().await? {
            Some(token) => Session {
                token,
                source: TokenSource::Cached,
            },
            None => Session {
                token: self.interactive_login().await?,
                source: TokenSource::Interactive,
            },
        };

        self.persist(&session.token);

        if let Some(expires_at) = session.token.expires_at() {
            info!("Access token valid until {}", expires_at);
        }

        Ok(session)
    }

    /// Redeem the cached refresh token, if any.
    /// A provider rejection is logged and reported as "no cached token".
    pub async fn try_cached_token(&self) -> Result<Option<TokenSet>> {
        let Some(refresh_token) = self.store.load()? else {
            return Ok(None);
        };

        match self.provider.refresh(&refresh_token).await {
            Ok(token) => {
                info!("✓ Signed in with cached refresh token");
                Ok(Some(token))
            }
            Err(e) if e.is_provider_error() => {
                warn!("Cached refresh token rejected: {}", e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Full browser round trip: authorization URL -> redirect -> code exchange
    pub async fn interactive_login(&self) -> Result<TokenSet> {
        let request = self.provider.authorization_request()?;
        let code = self.request_authorization_code(&request).await?;

        println!("Got code {}", code);
        let token = self
            .provider
            .exchange_code(&code, &request.pkce_verifier)
            .await?;
        println!("Got token");

        Ok(token)
    }

    /// Open the authorization URL and wait for the redirect carrying the code
    pub async fn request_authorization_code(&self, request: &AuthorizationRequest) -> Result<String> {
        println!("\n🔐 Sign in to continue:\n");
        println!("   {}\n", request.url);

        if let Err(e) = self.opener.open(&request.url) {
            warn!("Could not open a browser ({}); open the URL above manually", e);
        }

        let raw = self.listener.catch(self.redirect_timeout).await?;
        let params = parse_redirect(&raw)?;

        if let Some(state) = &params.state {
            if *state != request.state {
                return Err(AuthError::StateMismatch);
            }
        }

        Ok(params.code)
    }

    /// Overwrite the cache with the token's refresh component, if it has one.
    /// A failed write only costs a sign-in next run, so it is logged and not propagated.
    fn persist(&self, token: &TokenSet) {
        let Some(refresh_token) = token.refresh_token.as_deref() else {
            return;
        };

        if let Err(e) = self.store.save(refresh_token) {
            error!(
                "Failed to write refresh token to {}: {}",
                self.store.path().display(),
                e
            );
        }
    }
}
