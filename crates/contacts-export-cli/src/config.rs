//! Export configuration.
//!
//! Settings are layered: built-in defaults, then an optional `config.toml`
//! (`--config`, `CONTACTS_EXPORT_CONFIG`, or
//! `~/.config/contacts-export/config.toml` when it exists), then CLI flags.
//!
//! ```toml
//! [google]
//! credentials_file = "client_secret.json"
//! token_path = "token.json"
//! page_size = 1000
//! timeout_secs = 30
//! loopback_port_range = [8080, 8090]
//!
//! [output]
//! path = "contacts_with_timestamps.csv"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use contacts_export_providers::google::{GoogleConfig, OAuthCredentials};
use contacts_export_providers::{DEFAULT_PAGE_SIZE, FetchOptions, ProviderError, ProviderResult};

use crate::cli::Cli;

/// Default CSV output file, relative to the working directory.
pub const DEFAULT_OUTPUT_FILE: &str = "contacts_with_timestamps.csv";

/// Default OAuth client descriptor, relative to the working directory.
pub const DEFAULT_CREDENTIALS_FILE: &str = "client_secret.json";

/// Configuration for one export run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Google account access.
    pub google: GoogleSettings,

    /// Where the CSV goes.
    pub output: OutputSettings,
}

/// `[google]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    /// OAuth client descriptor downloaded from Google Cloud Console.
    pub credentials_file: PathBuf,

    /// Cached token file.
    pub token_path: PathBuf,

    /// Contacts requested per page.
    pub page_size: u32,

    /// HTTP request timeout in seconds.
    pub timeout_secs: u64,

    /// Ports tried for the OAuth loopback listener.
    pub loopback_port_range: (u16, u16),
}

impl Default for GoogleSettings {
    fn default() -> Self {
        Self {
            credentials_file: PathBuf::from(DEFAULT_CREDENTIALS_FILE),
            token_path: PathBuf::from(GoogleConfig::DEFAULT_TOKEN_FILE),
            page_size: DEFAULT_PAGE_SIZE,
            timeout_secs: GoogleConfig::DEFAULT_TIMEOUT_SECS,
            loopback_port_range: (8080, 8090),
        }
    }
}

/// `[output]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// CSV file to create or overwrite.
    pub path: PathBuf,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_OUTPUT_FILE),
        }
    }
}

impl ExportConfig {
    /// Loads configuration from the default path, or defaults if absent.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config {}: {}", path.display(), e))?;
        toml::from_str(&content)
            .map_err(|e| format!("failed to parse config {}: {}", path.display(), e))
    }

    /// Loads the file named on the command line, if any, and applies the
    /// flag overrides on top.
    pub fn from_cli(cli: &Cli) -> Result<Self, String> {
        let mut config = match cli.config {
            Some(ref path) => Self::load_from(path)?,
            None => Self::load()?,
        };
        config.apply_overrides(cli);
        Ok(config)
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("contacts-export")
            .join("config.toml")
    }

    /// Replaces settings with the ones given as flags.
    pub fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(ref path) = cli.credentials_file {
            self.google.credentials_file = path.clone();
        }
        if let Some(ref path) = cli.token_file {
            self.google.token_path = path.clone();
        }
        if let Some(page_size) = cli.page_size {
            self.google.page_size = page_size;
        }
        if let Some(ref path) = cli.output {
            self.output.path = path.clone();
        }
    }

    /// Pagination settings for the fetcher.
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions::new().with_page_size(self.google.page_size)
    }
}

impl GoogleSettings {
    /// Converts to provider configuration.
    ///
    /// Reads the client descriptor, so a missing or malformed one is
    /// reported here, before anything touches the network. The page size
    /// is not part of it; it travels in [`ExportConfig::fetch_options`].
    pub fn to_provider_config(&self) -> ProviderResult<GoogleConfig> {
        let credentials = OAuthCredentials::from_file(&self.credentials_file)?;
        credentials.validate().map_err(|e| {
            ProviderError::configuration(format!(
                "{}: {}",
                self.credentials_file.display(),
                e
            ))
        })?;

        let config = GoogleConfig::new(credentials)
            .with_token_path(&self.token_path)
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_loopback_port_range(self.loopback_port_range.0, self.loopback_port_range.1);

        config.validate().map_err(ProviderError::configuration)?;
        Ok(config)
    }
}
