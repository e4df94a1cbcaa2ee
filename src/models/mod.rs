mod acts;
mod dictionary;
mod entry;
mod errors;
mod validation;
mod wallet;

pub use acts::{act_key, ActFlag, ActLookup, ActsIndex, LookupError};
pub use dictionary::{DictionaryIndex, DictionaryRecord};
pub use entry::{entry_key, Entry};
pub use errors::{DuplicateOrigin, RowError, RowErrorKind};
pub use validation::validate;
pub use wallet::WalletBook;

/// Article labels that drive special handling. They are data values shared
/// with the dictionary sheet, so they stay in the workbook's language.
pub mod articles {
    pub const TRANSFER_OUT: &str = "Перевод на кошелек";
    pub const TOP_UP: &str = "Пополнение кошелька";
    pub const WAGE_PAYOUT: &str = "% Мастер";
    pub const DEPOSIT_RETURN: &str = "Возврат удержания";
    pub const REVENUE_BY_ACT: &str = "Выручка по акту";
    /// Category written on mirror entries.
    pub const TRANSFER_CATEGORY: &str = "Перевод м/у счетами";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryType {
    Income,
    Expense
}

impl EntryType {
    pub fn label(self) -> &'static str {
        match self {
            EntryType::Income => "Доход",
            EntryType::Expense => "Расход"
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Доход" => Some(EntryType::Income),
            "Расход" => Some(EntryType::Expense),
            _ => None
        }
    }
}

/// Direction of an internal wallet-to-wallet transfer, named after the article used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    /// Money leaves the entry's wallet for the wallet named in the decoding.
    Out,
    /// Money arrives in the entry's wallet from the wallet named in the decoding.
    In
}

impl TransferDirection {
    pub fn from_article(article: &str) -> Option<Self> {
        match article {
            articles::TRANSFER_OUT => Some(TransferDirection::Out),
            articles::TOP_UP => Some(TransferDirection::In),
            _ => None
        }
    }

    pub fn article(self) -> &'static str {
        match self {
            TransferDirection::Out => articles::TRANSFER_OUT,
            TransferDirection::In => articles::TOP_UP
        }
    }

    /// What the decoding of a transfer entry names.
    pub fn wallet_role(self) -> &'static str {
        match self {
            TransferDirection::Out => "target",
            TransferDirection::In => "source"
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            TransferDirection::Out => TransferDirection::In,
            TransferDirection::In => TransferDirection::Out
        }
    }

    /// Type of the entry booked on the wallet that receives this side of the transfer.
    pub fn entry_type(self) -> EntryType {
        match self {
            TransferDirection::Out => EntryType::Expense,
            TransferDirection::In => EntryType::Income
        }
    }
}
