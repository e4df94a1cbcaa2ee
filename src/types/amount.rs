use rust_decimal::Decimal;
use std::str::FromStr;

use crate::types::errors::AmountError;
use crate::types::Cell;

/// Reads a nonzero amount from a cell.
///
/// Text amounts may use a decimal comma and contain grouping spaces
/// (including non-breaking ones), as pasted from bank statements.
pub fn parse_amount(value: &Cell) -> Result<Decimal, AmountError> {
    let amount = match value {
        Cell::Number(number) => *number,
        Cell::Text(text) => parse_amount_text(text)?,
        Cell::Empty => return Err(AmountError::Missing),
        Cell::Bool(_) | Cell::Date(_) => return Err(AmountError::NotNumeric(value.to_string()))
    };

    if amount.is_zero() {
        return Err(AmountError::Zero);
    }

    Ok(amount)
}

/// Canonical text of an amount as used in entry keys: no trailing zeros, `.` separator.
pub fn format_amount(amount: Decimal) -> String {
    amount.normalize().to_string()
}

fn parse_amount_text(value: &str) -> Result<Decimal, AmountError> {
    let cleaned: String = value.chars()
        .filter(|character| !character.is_whitespace())
        .map(|character| if character == ',' { '.' } else { character })
        .collect();

    if cleaned.is_empty() {
        return Err(AmountError::Missing);
    }

    Decimal::from_str(&cleaned).map_err(|_| AmountError::NotNumeric(value.trim().to_string()))
}
