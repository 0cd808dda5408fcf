//! Produces a usable credential from the token cache or interactive consent.

use tracing::{debug, info, warn};

use crate::error::{ErrorCategory, ProviderError, ProviderResult};

use super::config::GoogleConfig;
use super::oauth::{AuthorizationGrant, OAuthClient};
use super::tokens::{TokenInfo, TokenStore};

/// Resolves the credential for one run.
///
/// Order of preference: a valid cached token with the contacts scope, a
/// refreshed cached token, then the browser consent flow.
pub struct Authenticator<S: TokenStore, G: AuthorizationGrant = OAuthClient> {
    config: GoogleConfig,
    grant: G,
    store: S,
    force_consent: bool,
}

impl<S: TokenStore> Authenticator<S> {
    /// Creates an authenticator reading and writing tokens through `store`.
    pub fn new(config: GoogleConfig, store: S) -> ProviderResult<Self> {
        let grant = OAuthClient::new(&config)?;
        Ok(Self::with_grant(config, store, grant))
    }
}

impl<S: TokenStore, G: AuthorizationGrant> Authenticator<S, G> {
    /// Creates an authenticator that obtains tokens through `grant`.
    pub fn with_grant(config: GoogleConfig, store: S, grant: G) -> Self {
        Self {
            config,
            grant,
            store,
            force_consent: false,
        }
    }

    /// Discards the cached token and always runs the consent flow.
    pub fn with_forced_consent(mut self, force: bool) -> Self {
        self.force_consent = force;
        self
    }

    /// Returns the token store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns a credential that carries the contacts scope.
    ///
    /// # Errors
    ///
    /// - an unreadable token cache or a refused refresh (authentication error)
    /// - consent that did not grant the contacts scope (scope error)
    pub async fn credential(&self) -> ProviderResult<TokenInfo> {
        let cached = if self.force_consent {
            info!(
                "re-authentication requested, discarding cached token at {}",
                self.store.location()
            );
            self.store.clear()?;
            None
        } else {
            self.store.load()?
        };

        if let Some(tokens) = cached {
            if !tokens.has_scopes(&self.config.scopes) {
                warn!(
                    "cached token at {} lacks the contacts scope, asking for consent again",
                    self.store.location()
                );
            } else if !tokens.is_expired() {
                debug!("using cached access token");
                return Ok(tokens);
            } else if let Some(refresh_token) = tokens.refresh_token.clone() {
                return self.refresh(tokens, &refresh_token).await;
            } else {
                warn!("cached token expired and has no refresh token, asking for consent again");
            }
        }

        let tokens = self
            .grant
            .request_consent(&self.config.scopes, self.config.loopback_port_range)
            .await?;
        self.accept_consent(tokens)
    }

    async fn refresh(&self, mut tokens: TokenInfo, refresh_token: &str) -> ProviderResult<TokenInfo> {
        info!("access token expired, refreshing");
        let refreshed = self.grant.refresh_access(refresh_token).await.map_err(|e| {
            match e.category() {
                ErrorCategory::Auth => ProviderError::authentication(format!(
                    "{}; delete {} and run again to re-authenticate",
                    e.message(),
                    self.store.location()
                ))
                .with_source(e),
                _ => e,
            }
        })?;

        tokens.apply_refresh(
            refreshed.access_token,
            refreshed.expires_in,
            refreshed.refresh_token,
        );
        self.store.save(&tokens)?;
        Ok(tokens)
    }

    /// Keeps a consented token set only if it carries the contacts scope.
    fn accept_consent(&self, tokens: TokenInfo) -> ProviderResult<TokenInfo> {
        if !tokens.has_scopes(&self.config.scopes) {
            return Err(ProviderError::insufficient_scope(format!(
                "consent did not grant {}; run again and allow access to your contacts",
                self.config.scopes.join(" ")
            )));
        }

        self.store.save(&tokens)?;
        info!("saved credentials to {}", self.store.location());
        Ok(tokens)
    }
}
