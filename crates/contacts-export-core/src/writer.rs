//! CSV serialization of exported contacts.
//!
//! The header is written explicitly so that an export with no contacts still
//! yields a well-formed file. Rows are written in the order given.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::row::{CSV_HEADER, ContactRow};

/// Errors raised while writing the CSV output.
#[derive(Debug, Error)]
pub enum WriteError {
    /// The output file could not be created.
    #[error("failed to create {}: {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Serializing a record failed.
    #[error("failed to write CSV record: {0}")]
    Csv(#[from] csv::Error),

    /// Flushing the output failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Writes the header and `rows` as CSV to `out`.
pub fn write_rows<W: Write>(out: W, rows: &[ContactRow]) -> Result<(), WriteError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(out);

    writer.write_record(CSV_HEADER)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Creates (or truncates) the file at `path` and writes `rows` to it.
///
/// Returns the number of data rows written.
pub fn write_csv(path: &Path, rows: &[ContactRow]) -> Result<usize, WriteError> {
    let file = File::create(path).map_err(|source| WriteError::Create {
        path: path.to_path_buf(),
        source,
    })?;

    write_rows(BufWriter::new(file), rows)?;
    debug!("wrote {} rows to {}", rows.len(), path.display());
    Ok(rows.len())
}
