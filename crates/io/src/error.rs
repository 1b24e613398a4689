use std::path::PathBuf;

use clusterprice_recon::{ReconError, Source};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    /// File missing, unreadable or not a workbook.
    #[error("{input}: cannot read '{}': {message}", .path.display())]
    Read {
        input: Source,
        path: PathBuf,
        message: String,
    },
    #[error("{input}: sheet '{sheet}' not found in '{}' (sheets: {})", .path.display(), .available.join(", "))]
    MissingSheet {
        input: Source,
        path: PathBuf,
        sheet: String,
        available: Vec<String>,
    },
    #[error("{input}: '{}' contains no sheets", .path.display())]
    NoSheets { input: Source, path: PathBuf },
    /// The layout expects headers on a row the sheet does not have.
    #[error("{input}: header row {} is beyond the {rows} row(s) of the sheet", .header_row + 1)]
    HeaderRow {
        input: Source,
        header_row: usize,
        rows: usize,
    },
    /// Schema or config problem raised while cleaning a loaded source.
    #[error(transparent)]
    Recon(#[from] ReconError),
    #[error("cannot write '{}': {message}", .path.display())]
    Write { path: PathBuf, message: String },
}

impl IoError {
    pub(crate) fn read(input: Source, path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Read {
            input,
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Write {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
