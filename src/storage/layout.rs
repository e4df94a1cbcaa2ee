//! Fixed geometry of the workbook. Column positions are part of the contract
//! with the people who maintain the sheets, not an implementation detail.

use crate::types::{ColumnNumber, RowNumber};

/// The inbox block `B10:L40`. Offsets below index into one block row.
pub mod inbox {
    use super::*;

    pub const FIRST_ROW: RowNumber = 10;
    pub const HEIGHT: usize = 31;
    pub const FIRST_COLUMN: ColumnNumber = 2;
    pub const WIDTH: usize = 11;
    /// `B:F` is free text typed or pasted by the operator.
    pub const TEXT_WIDTH: usize = 5;
    /// `B:G` is cleared once a row has been transferred.
    pub const EDITABLE_WIDTH: usize = 6;

    pub const DATE: usize = 0;
    pub const WALLET: usize = 1;
    pub const AMOUNT: usize = 2;
    pub const ARTICLE: usize = 3;
    pub const DECODING: usize = 4;
    pub const ACT_REFERENCE: usize = 5;
    pub const ALTERNATE_ARTICLE: usize = 6;
    pub const CATEGORY: usize = 7;
    pub const ENTRY_TYPE: usize = 8;
    pub const HINT: usize = 9;
    pub const FOREMAN: usize = 10;
}

/// The permanent ledger, one entry per row from row 2.
pub mod ledger {
    use super::*;

    pub const FIRST_DATA_ROW: RowNumber = 2;
    pub const WIDTH: usize = 10;
    pub const WALLET_COLUMN: ColumnNumber = 2;
    pub const AMOUNT_COLUMN: ColumnNumber = 3;
    /// Rows above the remembered write position scanned for a gap.
    pub const INSERTION_LOOKBACK: usize = 10;
    pub const LAST_ROW_PROPERTY: &str = "last_ledger_row";

    pub const DATE: usize = 0;
    pub const AMOUNT: usize = 2;
    pub const ARTICLE: usize = 3;
    pub const DECODING: usize = 4;
}

/// Article dictionary rows: type, category, article, decoding, act marker.
pub mod dictionary {
    use super::*;

    pub const FIRST_DATA_ROW: RowNumber = 2;
    pub const WIDTH: usize = 5;

    pub const ENTRY_TYPE: usize = 0;
    pub const CATEGORY: usize = 1;
    pub const ARTICLE: usize = 2;
    pub const DECODING: usize = 3;
    pub const ACT_MARKER: usize = 4;
}

/// Acts register columns, 1-based as on the sheet (`A:R`).
pub mod acts {
    use super::*;

    pub const FIRST_DATA_ROW: RowNumber = 2;
    pub const WIDTH: usize = 18;

    pub const ADDRESS: ColumnNumber = 2;
    pub const ACT_NUMBER: ColumnNumber = 3;
    pub const REVENUE: ColumnNumber = 5;
    pub const DEPOSIT: ColumnNumber = 10;
    pub const HANDS: ColumnNumber = 11;
    pub const WAGE_PAID_FLAG: ColumnNumber = 16;
    pub const DEPOSIT_RETURNED_FLAG: ColumnNumber = 17;
    pub const PAID_FLAG: ColumnNumber = 18;
}

pub mod colors {
    pub const INCOME_AMOUNT: &str = "#E6F4EA";
    pub const EXPENSE_AMOUNT: &str = "#FDEAEA";
    pub const SETTLED_BACKGROUND: &str = "#C6E0B4";
    pub const SETTLED_FONT: &str = "#385723";
}
