use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::{Entry, RowError};
use crate::storage::layout::inbox;
use crate::types::{parse_amount, parse_date, Cell};

/// Normalized fields of an inbox row that passed the structural checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRow {
    /// `None` when the date cell was blank; the caller picks the date.
    pub date: Option<NaiveDate>,
    pub wallet: String,
    pub amount: Decimal,
    pub article: String,
    pub decoding: String,
    pub act_reference: String,
    pub category: String,
    pub entry_type: String,
    pub hint: String,
    pub foreman: String
}

impl ValidatedRow {
    pub fn wants_today(&self) -> bool {
        self.date.is_none()
    }

    pub fn into_entry(self, today: NaiveDate) -> Entry {
        Entry {
            date: self.date.unwrap_or(today),
            wallet: self.wallet,
            amount: self.amount,
            article: self.article,
            decoding: self.decoding,
            act_reference: self.act_reference,
            category: self.category,
            entry_type: self.entry_type,
            hint: self.hint,
            foreman: self.foreman
        }
    }
}

/// Structural gate every inbox row passes through.
///
/// Checks, in order: type, category and an article (primary or alternate
/// column) are present; a wallet is present; the amount is a nonzero number;
/// a non-blank date is readable. Has no side effects.
pub fn validate(row: &[Cell]) -> Result<ValidatedRow, RowError> {
    let cell = |index: usize| row.get(index).unwrap_or(&Cell::Empty);
    let field = |index: usize| cell(index).as_text();

    let entry_type = field(inbox::ENTRY_TYPE);
    let category = field(inbox::CATEGORY);
    let primary_article = field(inbox::ARTICLE);
    let alternate_article = field(inbox::ALTERNATE_ARTICLE);

    if entry_type.is_empty() || category.is_empty() || (primary_article.is_empty() && alternate_article.is_empty()) {
        return Err(RowError::MissingClassification);
    }

    let wallet = field(inbox::WALLET);

    if wallet.is_empty() {
        return Err(RowError::MissingWallet);
    }

    let amount = parse_amount(cell(inbox::AMOUNT)).map_err(|_| RowError::MissingOrZeroAmount)?;

    let date_cell = cell(inbox::DATE);
    let date = if date_cell.is_blank() {
        None
    } else {
        Some(parse_date(date_cell).ok_or_else(|| RowError::UnparseableDate { value: date_cell.as_text() })?)
    };

    let article = if primary_article.is_empty() { alternate_article } else { primary_article };

    Ok(ValidatedRow {
        date,
        wallet,
        amount,
        article,
        decoding: field(inbox::DECODING),
        act_reference: field(inbox::ACT_REFERENCE),
        category,
        entry_type,
        hint: field(inbox::HINT),
        foreman: field(inbox::FOREMAN)
    })
}
