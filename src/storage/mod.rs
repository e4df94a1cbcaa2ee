mod csv_workbook;
mod errors;
pub mod layout;
mod workbook;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};

use crate::types::{Cell, ColumnNumber, RowNumber};

pub use csv_workbook::{load, save};
pub use errors::StorageError;
pub use workbook::Workbook;

/// The four sheets the transcription run touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sheet {
    Inbox,
    Ledger,
    Dictionary,
    Acts
}

impl Sheet {
    pub const ALL: [Sheet; 4] = [Sheet::Inbox, Sheet::Ledger, Sheet::Dictionary, Sheet::Acts];
}

impl Display for Sheet {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Sheet::Inbox => "inbox",
            Sheet::Ledger => "ledger",
            Sheet::Dictionary => "dictionary",
            Sheet::Acts => "acts"
        };
        write!(formatter, "{name}")
    }
}

/// A rectangular block of cells, 1-based like the sheet it addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub row: RowNumber,
    pub column: ColumnNumber,
    pub height: usize,
    pub width: usize
}

impl Region {
    pub fn new(row: RowNumber, column: ColumnNumber, height: usize, width: usize) -> Self {
        Self { row, column, height, width }
    }
}

/// Display attributes of a cell that the run reads back and rewrites.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellStyle {
    pub background: Option<String>,
    pub font_color: Option<String>,
    pub note: String,
    pub strike_through: bool
}

/// Read and write access to rectangular regions of a spreadsheet.
///
/// Every call is one round-trip to the backing medium, so callers read a
/// region once and write it back once.
pub trait Grid {
    /// Last row holding any value on the sheet, 0 when the sheet is empty.
    fn last_row(&self, sheet: Sheet) -> RowNumber;
    fn read_region(&self, sheet: Sheet, region: Region) -> Result<Vec<Vec<Cell>>, StorageError>;
    /// Formula text per cell, empty for plain values.
    fn read_formulas(&self, sheet: Sheet, region: Region) -> Result<Vec<Vec<String>>, StorageError>;
    fn write_region(&self, sheet: Sheet, row: RowNumber, column: ColumnNumber, values: &[Vec<Cell>]) -> Result<(), StorageError>;
    fn clear_region(&self, sheet: Sheet, region: Region) -> Result<(), StorageError>;
    fn read_styles(&self, sheet: Sheet, region: Region) -> Result<Vec<Vec<CellStyle>>, StorageError>;
    fn write_styles(&self, sheet: Sheet, row: RowNumber, column: ColumnNumber, styles: &[Vec<CellStyle>]) -> Result<(), StorageError>;
    fn set_strike_through(&self, sheet: Sheet, region: Region) -> Result<(), StorageError>;
    fn remove_filter(&self, sheet: Sheet) -> Result<(), StorageError>;
}

/// Document-level key-value store surviving between runs.
pub trait Properties {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Splits sorted, de-duplicated row numbers into `(first_row, length)` runs of consecutive rows.
pub fn contiguous_runs(rows: &[RowNumber]) -> Vec<(RowNumber, usize)> {
    let mut runs: Vec<(RowNumber, usize)> = Vec::new();

    for &row in rows {
        match runs.last_mut() {
            Some((start, length)) if *start + *length == row => *length += 1,
            _ => runs.push((row, 1))
        }
    }

    runs
}
