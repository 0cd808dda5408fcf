//! contacts-export CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use contacts_export_cli::cli::Cli;
use contacts_export_cli::config::ExportConfig;
use contacts_export_cli::error::{ExportError, ExportResult};
use contacts_export_cli::export::{self, ExportSummary};
use contacts_export_core::init_tracing;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.tracing_config()) {
        eprintln!("warning: {}", e);
    }

    match run(cli).await {
        Ok(summary) => {
            println!(
                "Successfully exported {} contacts to {}",
                summary.contacts,
                summary.output.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ExportResult<ExportSummary> {
    let config = ExportConfig::from_cli(&cli).map_err(ExportError::Config)?;

    println!("Google Contacts Exporter");
    println!("========================");
    println!();

    export::run(&config, cli.reauth).await
}
