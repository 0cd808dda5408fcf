//! [`ContactSource`] implementation for Google Contacts.

use tracing::debug;

use crate::error::ProviderResult;
use crate::provider::{BoxFuture, ContactPage, ContactSource, PageRequest};

use super::client::PeopleClient;
use super::config::GoogleConfig;
use super::tokens::TokenInfo;

/// Google Contacts source.
///
/// Holds an API client bound to one access token; obtaining that token is
/// the [`Authenticator`](super::Authenticator)'s job.
pub struct GoogleContacts {
    client: PeopleClient,
}

impl GoogleContacts {
    /// Provider name used in errors and logs.
    pub const NAME: &'static str = "google";

    /// Creates a source reading the contacts visible to `tokens`.
    pub fn new(config: &GoogleConfig, tokens: &TokenInfo) -> ProviderResult<Self> {
        debug!("creating People API client for {}", config.api_base_url);
        Ok(Self {
            client: PeopleClient::new(config, &tokens.access_token)?,
        })
    }
}

impl ContactSource for GoogleContacts {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn list_page(&self, request: PageRequest) -> BoxFuture<'_, ProviderResult<ContactPage>> {
        Box::pin(async move {
            self.client
                .list_connections(&request)
                .await
                .map_err(|e| e.with_provider(Self::NAME))
        })
    }
}
