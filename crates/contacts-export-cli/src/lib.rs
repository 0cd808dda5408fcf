//! CLI, configuration and export orchestration
//!
//! This crate provides the `contacts-export` command-line interface.

pub mod cli;
pub mod config;
pub mod error;
pub mod export;

pub use cli::Cli;
pub use error::{ExportError, ExportResult};
pub use export::{ExportSummary, fetch_and_write, run};
