//! ContactSource trait, pagination and normalization.
//!
//! This crate provides the abstraction layer for contact backends:
//!
//! - [`ContactSource`] - The trait a backend implements: fetch one page
//! - [`ContactFetcher`] - Bounded pagination loop over a source
//! - [`RawContact`] - Provider-agnostic raw contact data
//! - [`normalize_contact`] - Conversion of raw contacts to CSV rows
//! - [`ProviderError`] - Error types for provider operations
//!
//! # Architecture
//!
//! ```text
//!   ┌─────────────────┐
//!   │ Google People   │
//!   └────────┬────────┘
//!            │
//!            ▼
//!   ┌─────────────────┐
//!   │ GoogleContacts  │  ContactSource
//!   └────────┬────────┘
//!            │ ContactFetcher::fetch_all()
//!            ▼
//!     ┌─────────────┐
//!     │ RawContact  │
//!     └──────┬──────┘
//!            │ normalize_contact()
//!            ▼
//!     ┌─────────────┐
//!     │ ContactRow  │
//!     └─────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use contacts_export_providers::{ContactFetcher, ContactSource, FetchOptions, normalize_contacts};
//!
//! async fn rows(source: &dyn ContactSource) -> ProviderResult<Vec<ContactRow>> {
//!     let result = ContactFetcher::new(source, FetchOptions::new()).fetch_all().await?;
//!     Ok(normalize_contacts(&result.contacts))
//! }
//! ```

pub mod error;
#[cfg(feature = "google")]
pub mod google;
pub mod normalize;
pub mod provider;
pub mod raw_contact;

// Re-export main types at crate root
pub use error::{ErrorCategory, ProviderError, ProviderErrorCode, ProviderResult};
pub use normalize::{normalize_contact, normalize_contacts};
pub use provider::{
    BoxFuture, ContactFetcher, ContactPage, ContactSource, DEFAULT_MAX_PAGES, DEFAULT_PAGE_SIZE,
    FetchOptions, FetchResult, MAX_PAGE_SIZE, PageRequest, SAFETY_MARGIN,
};
pub use raw_contact::{RawContact, RawContactMetadata, RawName, RawOrganization, RawValue};
