//! Core types: contact rows, CSV output, tracing

pub mod row;
pub mod tracing;
pub mod writer;

pub use row::{CSV_HEADER, ContactRow};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
pub use writer::{WriteError, write_csv, write_rows};
