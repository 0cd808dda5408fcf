//! ContactSource trait and the pagination loop built on it.
//!
//! A [`ContactSource`] answers exactly one question: "give me the page that
//! starts at this cursor". [`ContactFetcher`] drives it until the provider
//! stops returning a cursor, accumulating every page in order.
//!
//! The loop is bounded. A provider that keeps handing out cursors forever
//! (or hands out one it already used) is reported as a protocol error
//! instead of spinning.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;

use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};
use crate::raw_contact::RawContact;

/// Page size used when none is configured; the People API maximum.
pub const DEFAULT_PAGE_SIZE: u32 = 1000;

/// Largest page size a provider accepts.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Request cap used when the provider does not report a total.
pub const DEFAULT_MAX_PAGES: usize = 10_000;

/// Requests allowed beyond the provider-reported total.
pub const SAFETY_MARGIN: usize = 10;

/// A boxed future for async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Parameters of one list request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Maximum number of contacts in the page.
    pub page_size: u32,
    /// Continuation cursor from the previous page; `None` for the first.
    pub page_token: Option<String>,
}

impl PageRequest {
    /// Creates a request for the first page.
    pub fn first(page_size: u32) -> Self {
        Self {
            page_size,
            page_token: None,
        }
    }

    /// Creates a request continuing at `page_token`.
    pub fn next(page_size: u32, page_token: impl Into<String>) -> Self {
        Self {
            page_size,
            page_token: Some(page_token.into()),
        }
    }
}

/// One page of contacts.
#[derive(Debug, Clone, Default)]
pub struct ContactPage {
    /// The contacts in this page, in provider order.
    pub contacts: Vec<RawContact>,
    /// Cursor for the next page; `None` (or empty) on the last page.
    pub next_page_token: Option<String>,
    /// Total number of contacts, if the provider reports it.
    pub total_items: Option<usize>,
}

impl ContactPage {
    /// Creates a page holding `contacts`.
    pub fn with_contacts(contacts: Vec<RawContact>) -> Self {
        Self {
            contacts,
            ..Default::default()
        }
    }

    /// Builder method to set the continuation cursor.
    pub fn with_next_page_token(mut self, token: impl Into<String>) -> Self {
        self.next_page_token = Some(token.into());
        self
    }

    /// Builder method to set the reported total.
    pub fn with_total_items(mut self, total: usize) -> Self {
        self.total_items = Some(total);
        self
    }
}

/// The core abstraction for contact backends.
pub trait ContactSource: Send + Sync {
    /// Returns the name of this source (e.g., "google").
    fn name(&self) -> &str;

    /// Fetches a single page.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` on network errors, rejected credentials,
    /// insufficient scope or undecodable responses.
    fn list_page(&self, request: PageRequest) -> BoxFuture<'_, ProviderResult<ContactPage>>;
}

/// Options for fetching the full contact list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Contacts requested per page.
    pub page_size: u32,
    /// Hard cap on requests when no total is reported.
    pub max_pages: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

impl FetchOptions {
    /// Creates new fetch options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the page size.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Builder method to set the request cap.
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Checks that the page size is within what providers accept.
    pub fn validate(&self) -> Result<(), String> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(format!(
                "page size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, self.page_size
            ));
        }
        if self.max_pages == 0 {
            return Err("max pages must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Everything a completed fetch produced.
#[derive(Debug, Default)]
pub struct FetchResult {
    /// All contacts, in provider order.
    pub contacts: Vec<RawContact>,
    /// Number of list requests issued.
    pub requests: usize,
}

/// Drives a [`ContactSource`] through every page.
pub struct ContactFetcher<'a, S: ContactSource + ?Sized> {
    source: &'a S,
    options: FetchOptions,
}

impl<'a, S: ContactSource + ?Sized> ContactFetcher<'a, S> {
    /// Creates a fetcher over `source`.
    pub fn new(source: &'a S, options: FetchOptions) -> Self {
        Self { source, options }
    }

    /// Fetches every page and returns all contacts.
    ///
    /// Any failing page aborts the whole fetch; nothing fetched so far is
    /// returned.
    ///
    /// # Errors
    ///
    /// Propagates the source's error for a failing page, and returns a
    /// protocol error when a cursor repeats or the request bound is hit.
    pub async fn fetch_all(&self) -> ProviderResult<FetchResult> {
        self.options
            .validate()
            .map_err(ProviderError::configuration)?;

        let page_size = self.options.page_size;
        let mut request = PageRequest::first(page_size);
        let mut contacts = Vec::new();
        let mut seen_tokens = HashSet::new();
        let mut requests = 0usize;
        let mut limit = self.options.max_pages;

        info!("retrieving contacts from {}", self.source.name());

        loop {
            if requests >= limit {
                return Err(ProviderError::protocol(format!(
                    "pagination did not finish after {} requests ({} contacts so far)",
                    requests,
                    contacts.len()
                ))
                .with_provider(self.source.name()));
            }

            debug!(
                page = requests + 1,
                token = request.page_token.as_deref().unwrap_or("<none>"),
                "requesting page"
            );
            let page = self.source.list_page(request).await?;
            requests += 1;

            if requests == 1
                && let Some(total) = page.total_items
            {
                // every page but the last carries at least one contact
                limit = limit.min(total.saturating_add(SAFETY_MARGIN));
                debug!(total, limit, "provider reported contact total");
            }

            let batch = page.contacts.len();
            contacts.extend(page.contacts);
            info!(
                "retrieved {} contacts (total: {})...",
                batch,
                contacts.len()
            );

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => {
                    if !seen_tokens.insert(token.clone()) {
                        return Err(ProviderError::protocol(format!(
                            "provider repeated page token {:?} after {} requests",
                            token, requests
                        ))
                        .with_provider(self.source.name()));
                    }
                    request = PageRequest::next(page_size, token);
                }
                None => break,
            }
        }

        info!(
            "retrieved {} contacts in {} requests",
            contacts.len(),
            requests
        );
        Ok(FetchResult { contacts, requests })
    }
}
