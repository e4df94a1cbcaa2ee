use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::EntryType;
use crate::types::{format_amount, format_date, Cell};

/// One confirmed ledger line, in the column order of the ledger sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub date: NaiveDate,
    pub wallet: String,
    /// Signed and never zero.
    pub amount: Decimal,
    pub article: String,
    /// Counterparty, object address or target wallet, depending on the article.
    pub decoding: String,
    pub act_reference: String,
    pub category: String,
    /// Type label as written in the sheet (`Доход` / `Расход`).
    pub entry_type: String,
    pub hint: String,
    pub foreman: String
}

impl Entry {
    /// Duplicate-detection key: `date|article|decoding|amount`.
    pub fn key(&self) -> String {
        entry_key(self.date, &self.article, &self.decoding, self.amount)
    }

    pub fn kind(&self) -> Option<EntryType> {
        EntryType::from_label(&self.entry_type)
    }

    /// Short human label used in logs and reports.
    pub fn label(&self) -> String {
        format!("{} {}", self.article, self.decoding).trim().to_string()
    }

    pub fn to_row(&self) -> Vec<Cell> {
        vec![
            Cell::Date(self.date),
            text_cell(&self.wallet),
            Cell::Number(self.amount),
            text_cell(&self.article),
            text_cell(&self.decoding),
            text_cell(&self.act_reference),
            text_cell(&self.category),
            text_cell(&self.entry_type),
            text_cell(&self.hint),
            text_cell(&self.foreman)
        ]
    }
}

pub fn entry_key(date: NaiveDate, article: &str, decoding: &str, amount: Decimal) -> String {
    format!("{}|{}|{}|{}", format_date(date), article, decoding, format_amount(amount))
}

fn text_cell(value: &str) -> Cell {
    if value.is_empty() {
        Cell::Empty
    } else {
        Cell::text(value)
    }
}
