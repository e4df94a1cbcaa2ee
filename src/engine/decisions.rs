use std::collections::HashMap;

use crate::models::ActFlag;

/// A doubtful situation the operator settles once per run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DecisionKey {
    /// Entry key matching the ledger tail or an earlier row of the run.
    Duplicate(String),
    /// Second payout against an act whose flag is already set.
    RepeatActPayout { act: String, flag: ActFlag }
}

/// Operator answers gathered before the main pass.
#[derive(Debug, Default)]
pub struct DecisionCache {
    answers: HashMap<DecisionKey, bool>
}

impl DecisionCache {
    pub fn record(&mut self, key: DecisionKey, accepted: bool) {
        self.answers.insert(key, accepted);
    }

    /// Unasked questions count as declined.
    pub fn accepts(&self, key: &DecisionKey) -> bool {
        self.answers.get(key).copied().unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }
}
