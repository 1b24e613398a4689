// File I/O: source extracts in, enriched workbook out

pub mod csv;
pub mod error;
pub mod load;
pub mod xlsx;

pub use error::IoError;
pub use load::{load_all, load_source, read_table, SourcePaths};
pub use xlsx::save;

use clusterprice_recon::Value;

/// Rows of cells as read from a file, before any header handling.
pub type Grid = Vec<Vec<Value>>;
