//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use contacts_export_core::{TracingConfig, TracingOutputFormat};

/// contacts-export - Export Google Contacts to CSV with creation and update timestamps
#[derive(Debug, Parser)]
#[command(name = "contacts-export")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "CONTACTS_EXPORT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to the OAuth client JSON downloaded from Google Cloud Console
    #[arg(long, env = "GOOGLE_CREDENTIALS_FILE")]
    pub credentials_file: Option<PathBuf>,

    /// Where the OAuth token is cached between runs
    #[arg(long)]
    pub token_file: Option<PathBuf>,

    /// Output CSV file
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Contacts requested per page (1-1000)
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Ignore the cached token and ask for consent again
    #[arg(long)]
    pub reauth: bool,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

impl Cli {
    /// Returns the tracing setup selected by the flags.
    pub fn tracing_config(&self) -> TracingConfig {
        let config = if self.debug {
            TracingConfig::cli_debug()
        } else {
            TracingConfig::cli()
        };
        config.with_format(self.log_format.into())
    }
}

/// Log output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Multi-line, human oriented
    Pretty,
    /// One line per event
    Compact,
    /// JSON lines
    Json,
}

impl From<LogFormat> for TracingOutputFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
            LogFormat::Json => Self::Json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tracing::Level;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["contacts-export"]).unwrap();
        assert!(cli.output.is_none());
        assert!(cli.page_size.is_none());
        assert!(!cli.reauth);
        assert_eq!(cli.log_format, LogFormat::Compact);
        assert_eq!(cli.tracing_config().default_level, Level::INFO);
    }

    #[test]
    fn all_flags() {
        let cli = Cli::try_parse_from([
            "contacts-export",
            "--credentials-file",
            "creds.json",
            "--token-file",
            "tok.json",
            "-o",
            "out.csv",
            "--page-size",
            "250",
            "--reauth",
            "-v",
            "--log-format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.credentials_file, Some(PathBuf::from("creds.json")));
        assert_eq!(cli.token_file, Some(PathBuf::from("tok.json")));
        assert_eq!(cli.output, Some(PathBuf::from("out.csv")));
        assert_eq!(cli.page_size, Some(250));
        assert!(cli.reauth);

        let tracing = cli.tracing_config();
        assert_eq!(tracing.default_level, Level::DEBUG);
        assert_eq!(tracing.output_format, TracingOutputFormat::Json);
    }

    #[test]
    fn rejects_unknown_log_format() {
        assert!(Cli::try_parse_from(["contacts-export", "--log-format", "xml"]).is_err());
    }
}
