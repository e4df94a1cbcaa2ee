use std::collections::HashSet;

use crate::models::{entry_key, DuplicateOrigin};
use crate::storage::layout::ledger;
use crate::types::{parse_amount, parse_date, Cell};

/// Remembers entry keys already in the ledger tail and accepted in this run.
#[derive(Debug, Default)]
pub struct DuplicateDetector {
    existing: HashSet<String>,
    accepted: HashSet<String>
}

impl DuplicateDetector {
    /// Keys of the last `window` ledger rows. Rows without a readable date,
    /// an article, a decoding or a nonzero amount never match anything.
    pub fn from_ledger(rows: &[Vec<Cell>], window: usize) -> Self {
        let tail = &rows[rows.len().saturating_sub(window)..];

        let existing = tail.iter().filter_map(|row| ledger_key(row)).collect();

        Self { existing, accepted: HashSet::new() }
    }

    pub fn existing_len(&self) -> usize {
        self.existing.len()
    }

    /// Entries flipping an act flag are checked against this run only; the
    /// flag itself guards against paying twice across runs.
    pub fn check(&self, key: &str, exempt_from_ledger: bool) -> Option<DuplicateOrigin> {
        if self.accepted.contains(key) {
            return Some(DuplicateOrigin::SameRun);
        }

        if !exempt_from_ledger && self.existing.contains(key) {
            return Some(DuplicateOrigin::Ledger);
        }

        None
    }

    pub fn accept(&mut self, key: String) {
        self.accepted.insert(key);
    }
}

fn ledger_key(row: &[Cell]) -> Option<String> {
    let cell = |index: usize| row.get(index).unwrap_or(&Cell::Empty);

    let date = parse_date(cell(ledger::DATE))?;
    let article = cell(ledger::ARTICLE).as_text();
    let decoding = cell(ledger::DECODING).as_text();
    let amount = parse_amount(cell(ledger::AMOUNT)).ok()?;

    if article.is_empty() || decoding.is_empty() {
        return None;
    }

    Some(entry_key(date, &article, &decoding, amount))
}
