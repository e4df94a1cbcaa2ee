use thiserror::Error;

use crate::storage::Sheet;
use crate::types::{ColumnNumber, RowNumber};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Sheet [{0}] is protected against edits")]
    Protected(Sheet),
    #[error("Invalid region on sheet [{sheet}] at row {row}, column {column}: rows and columns start at 1")]
    InvalidRegion {
        sheet: Sheet,
        row: RowNumber,
        column: ColumnNumber
    },
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage CSV error: {0}")]
    Csv(#[from] csv::Error)
}
