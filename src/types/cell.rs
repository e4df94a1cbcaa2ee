use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::types::format_date;

/// A single value held by a sheet cell.
///
/// Mirrors what a spreadsheet hands back from a value read: nothing, free text,
/// a number, a checkbox, or a native date.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Number(Decimal),
    Bool(bool),
    Date(NaiveDate)
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// True for empty cells and for text made only of whitespace.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(text) => text.trim().is_empty(),
            _ => false
        }
    }

    /// Display text of the cell with surrounding whitespace removed.
    pub fn as_text(&self) -> String {
        self.to_string().trim().to_string()
    }

    /// Checkbox semantics: a flag column counts as set for any non-blank, non-false value.
    pub fn is_truthy(&self) -> bool {
        match self {
            Cell::Empty => false,
            Cell::Text(text) => !text.is_empty(),
            Cell::Number(number) => !number.is_zero(),
            Cell::Bool(flag) => *flag,
            Cell::Date(_) => true
        }
    }

    /// Infers a typed cell from raw exported text.
    ///
    /// Only text already written the way a number prints back becomes
    /// [`Cell::Number`]; "007", "12.10" or "+7999..." stay text so a
    /// save keeps them exactly.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return Cell::Empty;
        }

        if trimmed.eq_ignore_ascii_case("true") {
            return Cell::Bool(true);
        }

        if trimmed.eq_ignore_ascii_case("false") {
            return Cell::Bool(false);
        }

        match Decimal::from_str(trimmed) {
            Ok(number) if number.normalize().to_string() == trimmed => Cell::Number(number),
            _ => Cell::Text(raw.to_string())
        }
    }
}

impl Display for Cell {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(text) => write!(formatter, "{text}"),
            Cell::Number(number) => write!(formatter, "{}", number.normalize()),
            Cell::Bool(true) => write!(formatter, "TRUE"),
            Cell::Bool(false) => write!(formatter, "FALSE"),
            Cell::Date(date) => write!(formatter, "{}", format_date(*date))
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<Decimal> for Cell {
    fn from(value: Decimal) -> Self {
        Cell::Number(value)
    }
}

impl From<NaiveDate> for Cell {
    fn from(value: NaiveDate) -> Self {
        Cell::Date(value)
    }
}

impl From<bool> for Cell {
    fn from(value: bool) -> Self {
        Cell::Bool(value)
    }
}
