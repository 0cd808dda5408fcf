//! Google Contacts provider.
//!
//! Reads the authenticated user's connections through the Google People API.
//!
//! # Authentication Flow
//!
//! 1. The user supplies their own OAuth client descriptor (required by Google)
//! 2. A cached token is reused, or refreshed when expired
//! 3. Otherwise a loopback listener is bound and the consent page opened
//! 4. Google redirects to the listener with an authorization code
//! 5. The code is exchanged for tokens, which are cached for the next run
//!
//! # Example
//!
//! ```ignore
//! use contacts_export_providers::google::{
//!     Authenticator, FileTokenStore, GoogleConfig, GoogleContacts, OAuthCredentials,
//! };
//! use contacts_export_providers::{ContactFetcher, FetchOptions};
//!
//! let credentials = OAuthCredentials::from_file("client_secret.json")?;
//! let config = GoogleConfig::new(credentials);
//!
//! let auth = Authenticator::new(config.clone(), FileTokenStore::new(&config.token_path))?;
//! let tokens = auth.credential().await?;
//!
//! let source = GoogleContacts::new(&config, &tokens)?;
//! let result = ContactFetcher::new(&source, FetchOptions::new()).fetch_all().await?;
//! ```

mod auth;
mod client;
mod config;
mod oauth;
mod provider;
mod tokens;

pub use auth::Authenticator;
pub use client::{PERSON_FIELDS, PeopleClient};
pub use config::{GoogleConfig, OAuthCredentials};
pub use oauth::{AuthorizationGrant, OAuthClient, PkceFlow, RefreshedToken};
pub use provider::GoogleContacts;
pub use tokens::{FileTokenStore, MemoryTokenStore, TokenInfo, TokenStore};
