mod amount;
mod cell;
mod dates;
mod errors;

pub use amount::{format_amount, parse_amount};
pub use cell::Cell;
pub use dates::{clamp_to_current_month, compare_month, format_date, parse_date};

/// 1-based row number on a sheet, as the operator sees it.
pub type RowNumber = usize;
/// 1-based column number on a sheet.
pub type ColumnNumber = usize;
