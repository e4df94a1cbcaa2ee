//! Index over the article dictionary.
//!
//! Each dictionary row names a type, a category, an article and one allowed
//! decoding for it, plus an optional marker saying the article needs an act.
//! An article whose decoding starts with [`WILDCARD_SENTINEL`] takes free-form
//! decodings instead of a fixed menu.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::storage::layout::dictionary;
use crate::types::Cell;

pub const WILDCARD_SENTINEL: char = '#';
const REQUIRES_ACT: &str = "акт";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryRecord {
    pub entry_type: String,
    pub category: String,
    pub article: String,
    pub decoding: String,
    pub act_marker: String
}

impl DictionaryRecord {
    pub fn from_row(row: &[Cell]) -> Self {
        let field = |index: usize| row.get(index).map(Cell::as_text).unwrap_or_default();

        Self {
            entry_type: field(dictionary::ENTRY_TYPE),
            category: field(dictionary::CATEGORY),
            article: field(dictionary::ARTICLE),
            decoding: field(dictionary::DECODING),
            act_marker: field(dictionary::ACT_MARKER)
        }
    }

    pub fn to_row(&self) -> Vec<Cell> {
        vec![
            Cell::text(self.entry_type.clone()),
            Cell::text(self.category.clone()),
            Cell::text(self.article.clone()),
            Cell::text(self.decoding.clone()),
            if self.act_marker.is_empty() { Cell::Empty } else { Cell::text(self.act_marker.clone()) }
        ]
    }

    pub fn requires_act(&self) -> bool {
        self.act_marker.trim().to_lowercase() == REQUIRES_ACT
    }
}

/// Type, category and act requirement of an article, taken from its first dictionary row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleMeta {
    pub entry_type: String,
    pub category: String,
    pub act_marker: String,
    pub act_required: bool
}

/// Read-once snapshot of the dictionary sheet.
#[derive(Debug, Clone, Default)]
pub struct DictionaryIndex {
    pairs: HashSet<(String, String)>,
    acts_required: HashSet<String>,
    wildcard_articles: HashSet<String>,
    meta: HashMap<String, ArticleMeta>,
    by_decoding: HashMap<String, BTreeSet<String>>
}

impl DictionaryIndex {
    pub fn build(records: &[DictionaryRecord]) -> Self {
        let mut index = Self::default();

        for record in records.iter().filter(|record| !record.article.is_empty()) {
            let article = &record.article;

            index.pairs.insert((article.clone(), record.decoding.clone()));

            if record.requires_act() {
                index.acts_required.insert(article.clone());
            }

            if record.decoding.starts_with(WILDCARD_SENTINEL) {
                index.wildcard_articles.insert(article.clone());
            }

            index.meta.entry(article.clone()).or_insert_with(|| ArticleMeta {
                entry_type: record.entry_type.clone(),
                category: record.category.clone(),
                act_marker: record.act_marker.clone(),
                act_required: record.requires_act()
            });

            if !record.decoding.is_empty() {
                index.by_decoding.entry(record.decoding.clone()).or_default().insert(article.clone());
            }
        }

        index
    }

    pub fn from_rows(rows: &[Vec<Cell>]) -> Self {
        let records: Vec<DictionaryRecord> = rows.iter().map(|row| DictionaryRecord::from_row(row)).collect();
        Self::build(&records)
    }

    pub fn contains_pair(&self, article: &str, decoding: &str) -> bool {
        self.pairs.contains(&(article.to_string(), decoding.to_string()))
    }

    pub fn requires_act(&self, article: &str) -> bool {
        self.acts_required.contains(article)
    }

    pub fn is_wildcard(&self, article: &str) -> bool {
        self.wildcard_articles.contains(article)
    }

    pub fn meta(&self, article: &str) -> Option<&ArticleMeta> {
        self.meta.get(article)
    }

    /// Articles that list `decoding` among their allowed decodings.
    pub fn articles_for_decoding(&self, decoding: &str) -> Option<&BTreeSet<String>> {
        self.by_decoding.get(decoding.trim())
    }

    /// The only article using `decoding`, if exactly one does.
    pub fn resolve_article(&self, decoding: &str) -> Option<&str> {
        let articles = self.articles_for_decoding(decoding)?;

        match articles.len() {
            1 => articles.iter().next().map(String::as_str),
            _ => None
        }
    }

    /// A new dictionary row pairing `decoding` with a known `article`.
    pub fn record_for(&self, article: &str, decoding: &str) -> Option<DictionaryRecord> {
        let meta = self.meta(article)?;

        Some(DictionaryRecord {
            entry_type: meta.entry_type.clone(),
            category: meta.category.clone(),
            article: article.to_string(),
            decoding: decoding.to_string(),
            act_marker: meta.act_marker.clone()
        })
    }
}
