//! Act payout bookkeeping.
//!
//! A wage payout or a deposit return references an act by object address
//! (the entry's decoding) and act number (its act reference). Each of these
//! payouts flips a one-way flag on the act; revenue by act only tags the
//! act's revenue cell with the wallet color.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::models::{act_key, articles, ActFlag, ActLookup, ActsIndex, Entry, LookupError, RowError, WalletBook};
use crate::types::RowNumber;

const ACT_NUMBER_KEYWORD: &str = "акт";

/// A payout entry resolved to its act, not yet applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActClaim {
    pub key: String,
    pub flag: ActFlag,
    pub lookup: ActLookup
}

impl ActClaim {
    pub fn already_set(&self) -> bool {
        self.lookup.is_set(self.flag)
    }
}

/// Register changes accumulated during a run and flushed once.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ActUpdates {
    pub wage_rows: BTreeSet<RowNumber>,
    pub deposit_rows: BTreeSet<RowNumber>,
    /// Revenue cell color per register row; the last tagged entry wins.
    pub revenue_colors: BTreeMap<RowNumber, String>
}

impl ActUpdates {
    pub fn rows(&self, flag: ActFlag) -> &BTreeSet<RowNumber> {
        match flag {
            ActFlag::WagePaid => &self.wage_rows,
            ActFlag::DepositReturned => &self.deposit_rows
        }
    }

    pub fn is_empty(&self) -> bool {
        self.wage_rows.is_empty() && self.deposit_rows.is_empty() && self.revenue_colors.is_empty()
    }
}

pub struct ActReconciler {
    acts: ActsIndex,
    updates: ActUpdates
}

impl ActReconciler {
    pub fn new(acts: ActsIndex) -> Self {
        Self { acts, updates: ActUpdates::default() }
    }

    /// Resolves a payout entry to its act. `Ok(None)` for entries that do
    /// not flip a flag. Nothing changes until [`ActReconciler::commit`].
    pub fn claim(&self, entry: &Entry) -> Result<Option<ActClaim>, RowError> {
        let Some(flag) = ActFlag::for_article(&entry.article) else {
            return Ok(None);
        };

        if !self.acts.is_loaded() {
            return Err(RowError::ActsRegisterUnavailable { article: entry.article.clone() });
        }

        if entry.decoding.trim().is_empty() {
            return Err(RowError::MissingAddressForActEntry { article: entry.article.clone() });
        }

        if !entry.act_reference.to_lowercase().contains(ACT_NUMBER_KEYWORD) {
            return Err(RowError::MissingActNumber { act_reference: entry.act_reference.clone() });
        }

        let key = act_key(&entry.decoding, &entry.act_reference)
            .ok_or_else(|| RowError::MissingAddressForActEntry { article: entry.article.clone() })?;

        // A register that loaded without a single keyed row reports NoData.
        let lookup = self.acts.lookup(&key).map_err(|error| match error {
            LookupError::NoData => RowError::RegisterNotReady,
            LookupError::NotFound => RowError::ActNotFoundInRegister { key: key.clone() }
        })?;

        if lookup.paid {
            debug!("Act [{key}] is marked paid in full");
        }

        Ok(Some(ActClaim { key, flag, lookup }))
    }

    /// Sets the claimed flag in memory and queues the register row for the flush.
    pub fn commit(&mut self, claim: &ActClaim) {
        self.acts.set_flag(claim.lookup.grid_index, claim.flag);

        match claim.flag {
            ActFlag::WagePaid => self.updates.wage_rows.insert(claim.lookup.row),
            ActFlag::DepositReturned => self.updates.deposit_rows.insert(claim.lookup.row)
        };
    }

    /// Queues the wallet color for the act a revenue entry references.
    /// Returns whether the entry matched a register row.
    pub fn tag_revenue(&mut self, entry: &Entry, wallets: &WalletBook) -> bool {
        if entry.article != articles::REVENUE_BY_ACT {
            return false;
        }

        let Some(row) = act_key(&entry.decoding, &entry.act_reference).and_then(|key| self.acts.row_for(&key)) else {
            return false;
        };

        let Some(color) = wallets.color(&entry.wallet) else {
            return false;
        };

        self.updates.revenue_colors.insert(row, color.to_string());
        true
    }

    pub fn is_loaded(&self) -> bool {
        self.acts.is_loaded()
    }

    pub fn into_updates(self) -> ActUpdates {
        self.updates
    }
}
