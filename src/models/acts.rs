use std::collections::HashMap;
use std::fmt;
use std::fmt::{Display, Formatter};

use crate::models::articles;
use crate::storage::layout::acts;
use crate::types::{Cell, ColumnNumber, RowNumber};

/// Composite act key `address|act_number`, or `None` when both parts are blank.
pub fn act_key(address: &str, act_number: &str) -> Option<String> {
    let address = address.trim();
    let act_number = act_number.trim();

    if address.is_empty() && act_number.is_empty() {
        return None;
    }

    Some(format!("{address}|{act_number}"))
}

/// One-way payout flags kept on an act.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActFlag {
    WagePaid,
    DepositReturned
}

impl ActFlag {
    pub fn for_article(article: &str) -> Option<Self> {
        match article {
            articles::WAGE_PAYOUT => Some(ActFlag::WagePaid),
            articles::DEPOSIT_RETURN => Some(ActFlag::DepositReturned),
            _ => None
        }
    }

    /// Register column holding the flag.
    pub fn column(self) -> ColumnNumber {
        match self {
            ActFlag::WagePaid => acts::WAGE_PAID_FLAG,
            ActFlag::DepositReturned => acts::DEPOSIT_RETURNED_FLAG
        }
    }

    /// Amount column styled as settled once the flag is set.
    pub fn settled_column(self) -> ColumnNumber {
        match self {
            ActFlag::WagePaid => acts::HANDS,
            ActFlag::DepositReturned => acts::DEPOSIT
        }
    }
}

impl Display for ActFlag {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ActFlag::WagePaid => write!(formatter, "wage paid"),
            ActFlag::DepositReturned => write!(formatter, "deposit returned")
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActLookup {
    pub row: RowNumber,
    pub grid_index: usize,
    pub paid: bool,
    pub wage_paid: bool,
    pub deposit_returned: bool
}

impl ActLookup {
    pub fn is_set(&self, flag: ActFlag) -> bool {
        match flag {
            ActFlag::WagePaid => self.wage_paid,
            ActFlag::DepositReturned => self.deposit_returned
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupError {
    /// The register was never loaded or holds no rows.
    NoData,
    NotFound
}

/// In-memory copy of the acts register with a key index.
///
/// Flags are flipped on the copy during a run and flushed to the sheet once
/// at the end.
#[derive(Debug, Clone, Default)]
pub struct ActsIndex {
    grid: Option<Vec<Vec<Cell>>>,
    key_to_row: HashMap<String, RowNumber>
}

impl ActsIndex {
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Indexes register rows read from [`acts::FIRST_DATA_ROW`] downwards.
    /// The first row wins when two rows share a key.
    pub fn build(grid: Vec<Vec<Cell>>) -> Self {
        if grid.is_empty() {
            return Self::unavailable();
        }

        let mut key_to_row = HashMap::new();

        for (index, row) in grid.iter().enumerate() {
            let Some(key) = act_key(&column_text(row, acts::ADDRESS), &column_text(row, acts::ACT_NUMBER)) else {
                continue;
            };

            key_to_row.entry(key).or_insert(acts::FIRST_DATA_ROW + index);
        }

        Self { grid: Some(grid), key_to_row }
    }

    pub fn is_loaded(&self) -> bool {
        self.grid.as_ref().is_some_and(|grid| !grid.is_empty())
    }

    pub fn row_for(&self, key: &str) -> Option<RowNumber> {
        self.key_to_row.get(key).copied()
    }

    /// `NoData` when the register is missing or none of its rows carries a
    /// key, `NotFound` when `key` is blank or absent.
    pub fn lookup(&self, key: &str) -> Result<ActLookup, LookupError> {
        let grid = self.grid.as_ref().ok_or(LookupError::NoData)?;

        if self.key_to_row.is_empty() {
            return Err(LookupError::NoData);
        }

        if key.is_empty() {
            return Err(LookupError::NotFound);
        }

        let row = self.row_for(key).ok_or(LookupError::NotFound)?;
        let grid_index = row - acts::FIRST_DATA_ROW;
        let cells = grid.get(grid_index).ok_or(LookupError::NotFound)?;
        let flag = |column: ColumnNumber| cells.get(column - 1).is_some_and(Cell::is_truthy);

        Ok(ActLookup {
            row,
            grid_index,
            paid: flag(acts::PAID_FLAG),
            wage_paid: flag(acts::WAGE_PAID_FLAG),
            deposit_returned: flag(acts::DEPOSIT_RETURNED_FLAG)
        })
    }

    /// Marks `flag` on the in-memory row; a later lookup sees it as already set.
    pub fn set_flag(&mut self, grid_index: usize, flag: ActFlag) {
        let Some(row) = self.grid.as_mut().and_then(|grid| grid.get_mut(grid_index)) else {
            return;
        };

        let column = flag.column();

        if row.len() < column {
            row.resize(column, Cell::Empty);
        }

        row[column - 1] = Cell::Bool(true);
    }
}

fn column_text(row: &[Cell], column: ColumnNumber) -> String {
    row.get(column - 1).map(Cell::as_text).unwrap_or_default()
}
