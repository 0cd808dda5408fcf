//! Export error types.

use contacts_export_core::WriteError;
use contacts_export_providers::{ErrorCategory, ProviderError};
use thiserror::Error;

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// A failed export, tagged with the phase that failed.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Configuration file, flags or client descriptor.
    #[error("configuration failed: {0}")]
    Config(String),

    /// Obtaining a credential.
    #[error("authentication failed: {0}")]
    Auth(#[source] ProviderError),

    /// Retrieving contacts.
    #[error("fetching contacts failed: {0}")]
    Fetch(#[source] ProviderError),

    /// Writing the CSV file.
    #[error("writing CSV failed: {0}")]
    Write(#[from] WriteError),
}

impl ExportError {
    /// Name of the failed phase.
    pub fn phase(&self) -> &'static str {
        match self {
            Self::Config(_) => "configuration",
            Self::Auth(_) => "authentication",
            Self::Fetch(_) => "fetch",
            Self::Write(_) => "write",
        }
    }

    /// Category of the underlying provider error, if there is one.
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            Self::Config(_) => Some(ErrorCategory::Config),
            Self::Auth(e) | Self::Fetch(e) => Some(e.category()),
            Self::Write(_) => None,
        }
    }
}

impl From<ProviderError> for ExportError {
    /// Provider errors raised while setting up are configuration failures.
    fn from(err: ProviderError) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_phase() {
        let err = ExportError::Fetch(ProviderError::protocol("cursor repeated"));
        assert_eq!(err.phase(), "fetch");
        assert_eq!(err.category(), Some(ErrorCategory::Protocol));
        let message = err.to_string();
        assert!(message.starts_with("fetching contacts failed"));
        assert!(message.contains("ProtocolError"));
    }

    #[test]
    fn setup_provider_errors_become_config_errors() {
        let err: ExportError = ProviderError::configuration("client_secret.json not found").into();
        assert_eq!(err.phase(), "configuration");
        assert!(err.to_string().contains("client_secret.json"));
    }

    #[test]
    fn auth_keeps_scope_category() {
        let err = ExportError::Auth(ProviderError::insufficient_scope("no contacts scope"));
        assert_eq!(err.category(), Some(ErrorCategory::Scope));
    }
}
