//! Export orchestration.
//!
//! One run walks the phases in order: configuration, authentication, fetch,
//! normalize, write. The first failure aborts the run; nothing is retried
//! and no partial CSV is written.

use std::path::{Path, PathBuf};

use tracing::info;

use contacts_export_core::write_csv;
use contacts_export_providers::google::{Authenticator, FileTokenStore, GoogleContacts};
use contacts_export_providers::{ContactFetcher, ContactSource, FetchOptions, normalize_contacts};

use crate::config::ExportConfig;
use crate::error::{ExportError, ExportResult};

/// What a successful export did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    /// Data rows written.
    pub contacts: usize,
    /// List requests issued.
    pub requests: usize,
    /// The CSV file.
    pub output: PathBuf,
}

/// Fetches every contact from `source` and writes them to `output`.
///
/// The file is only created once the whole fetch has succeeded.
pub async fn fetch_and_write<S: ContactSource + ?Sized>(
    source: &S,
    options: FetchOptions,
    output: &Path,
) -> ExportResult<ExportSummary> {
    let result = ContactFetcher::new(source, options)
        .fetch_all()
        .await
        .map_err(ExportError::Fetch)?;

    if result.contacts.is_empty() {
        info!("no contacts found, writing header only");
    } else {
        info!("processing contact data...");
    }
    let rows = normalize_contacts(&result.contacts);
    let blank = rows.iter().filter(|row| row.is_blank()).count();
    if blank > 0 {
        info!("{} contacts have no exported fields, writing empty rows", blank);
    }

    let written = write_csv(output, &rows)?;
    info!("exported {} contacts to {}", written, output.display());

    Ok(ExportSummary {
        contacts: written,
        requests: result.requests,
        output: output.to_path_buf(),
    })
}

/// Runs a complete export against Google Contacts.
///
/// `reauth` ignores the cached token and asks for consent again.
pub async fn run(config: &ExportConfig, reauth: bool) -> ExportResult<ExportSummary> {
    let google = config.google.to_provider_config()?;
    let options = config.fetch_options();
    options.validate().map_err(ExportError::Config)?;

    let store = FileTokenStore::new(&google.token_path);
    let authenticator = Authenticator::new(google.clone(), store)?.with_forced_consent(reauth);

    info!("authenticating with Google...");
    let tokens = authenticator.credential().await.map_err(ExportError::Auth)?;

    let source = GoogleContacts::new(&google, &tokens)?;
    fetch_and_write(&source, options, &config.output.path).await
}
