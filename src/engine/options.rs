use std::time::Duration;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::WalletBook;

/// Knobs of a single transfer run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Unattended: no prompts, every doubtful row is rejected.
    pub auto: bool,
    /// Trailing ledger rows scanned for duplicates.
    pub ledger_window: usize,
    /// Amounts above this (in absolute value) are flagged in the report.
    pub big_amount_limit: Decimal,
    pub prompt_timeout: Duration,
    /// Rejections listed in the printed report before truncation.
    pub report_limit: usize,
    /// Whether an unattended run may extend the dictionary.
    pub approve_new_decodings: bool,
    pub wallets: WalletBook,
    /// Fixed "today"; the local date when unset.
    pub today: Option<NaiveDate>
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            auto: false,
            ledger_window: 50,
            big_amount_limit: Decimal::from(1_000_000),
            prompt_timeout: Duration::from_secs(20),
            report_limit: 30,
            approve_new_decodings: false,
            wallets: WalletBook::default(),
            today: None
        }
    }
}
