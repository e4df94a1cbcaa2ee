use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::time::Duration;

use crate::models::{RowError, RowErrorKind};
use crate::types::RowNumber;

/// An inbox row left in place, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub row: RowNumber,
    pub error: RowError
}

impl Display for Rejection {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "row {}: {}", self.row, self.error)
    }
}

/// Outcome of one transfer run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Ledger rows written, mirror entries included.
    pub written: usize,
    pub rejections: Vec<Rejection>,
    /// `article / decoding` pairs added to the dictionary.
    pub new_decodings: Vec<String>,
    pub big_amounts: Vec<String>,
    pub unknown_articles: BTreeSet<String>,
    pub persistence_failures: Vec<String>,
    pub elapsed: Duration
}

impl RunReport {
    pub fn reject(&mut self, row: RowNumber, error: RowError) {
        self.rejections.push(Rejection { row, error });
    }

    pub fn counts(&self) -> BTreeMap<RowErrorKind, usize> {
        let mut counts = BTreeMap::new();

        for rejection in &self.rejections {
            *counts.entry(rejection.error.kind()).or_insert(0) += 1;
        }

        counts
    }

    pub fn summary(&self) -> String {
        format!(
            "Transferred: {}. Not transferred: {}. Decodings added: {}.",
            self.written,
            self.rejections.len(),
            self.new_decodings.len()
        )
    }

    /// Multi-line report listing at most `limit` rejections.
    pub fn render(&self, limit: usize) -> String {
        let mut lines = vec![self.summary()];

        let counts = self.counts();
        if !counts.is_empty() {
            let stats: Vec<String> = counts.iter().map(|(kind, count)| format!("{kind}: {count}")).collect();
            lines.push(format!("Stats: {}", stats.join(", ")));
        }

        if !self.rejections.is_empty() {
            lines.push("Rejected:".to_string());
            lines.extend(self.rejections.iter().take(limit).map(|rejection| format!("  {rejection}")));

            if self.rejections.len() > limit {
                lines.push(format!("  ... and {} more", self.rejections.len() - limit));
            }
        }

        if !self.new_decodings.is_empty() {
            lines.push(format!("New decodings: {}", self.new_decodings.join("; ")));
        }

        if !self.big_amounts.is_empty() {
            lines.push(format!("Big amounts: {}", self.big_amounts.join("; ")));
        }

        if !self.unknown_articles.is_empty() {
            let articles: Vec<&str> = self.unknown_articles.iter().map(String::as_str).collect();
            lines.push(format!("Articles missing from the dictionary: {}", articles.join(", ")));
        }

        for failure in &self.persistence_failures {
            lines.push(format!("Not saved: {failure}"));
        }

        lines.push(format!("Done in {:.2?}", self.elapsed));
        lines.join("\n")
    }
}
