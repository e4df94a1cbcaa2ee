use std::fmt;
use std::fmt::{Display, Formatter};

use thiserror::Error;

use crate::models::{ActFlag, TransferDirection};

/// Where the earlier copy of a duplicate entry was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateOrigin {
    Ledger,
    SameRun
}

impl Display for DuplicateOrigin {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DuplicateOrigin::Ledger => write!(formatter, "already in the ledger"),
            DuplicateOrigin::SameRun => write!(formatter, "repeated within this run")
        }
    }
}

/// Why a single inbox row was not transferred.
///
/// Row errors never abort a run; they are collected per row and bucketed by
/// [`RowErrorKind`] for the summary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("No type, category or article")]
    MissingClassification,
    #[error("No wallet")]
    MissingWallet,
    #[error("No amount or the amount is 0")]
    MissingOrZeroAmount,
    #[error("Date '{value}' is not a recognizable date")]
    UnparseableDate {
        value: String
    },
    #[error("Article \"{article}\" requires an act reference")]
    ActRequiredButMissing {
        article: String
    },
    #[error("Duplicate entry [{key}] {origin}")]
    DuplicateRejected {
        key: String,
        origin: DuplicateOrigin
    },
    #[error("Article \"{article}\" requires a decoding")]
    WildcardArticleMissingDecoding {
        article: String
    },
    #[error("\"{}\" requires the {} wallet in the decoding, got '{decoding}'", .direction.article(), .direction.wallet_role())]
    TransferMirrorRejected {
        direction: TransferDirection,
        decoding: String
    },
    #[error("Acts register is not available for \"{article}\"")]
    ActsRegisterUnavailable {
        article: String
    },
    #[error("\"{article}\" requires the object address in the decoding")]
    MissingAddressForActEntry {
        article: String
    },
    #[error("Act reference '{act_reference}' does not name an act")]
    MissingActNumber {
        act_reference: String
    },
    #[error("Act [{key}] was not found in the acts register")]
    ActNotFoundInRegister {
        key: String
    },
    #[error("Acts register index is not ready")]
    RegisterNotReady,
    #[error("Act [{key}] is already marked {flag}")]
    AlreadyPaidOut {
        key: String,
        flag: ActFlag
    }
}

/// Bucket of a [`RowError`], used for statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RowErrorKind {
    MissingClassification,
    MissingWallet,
    MissingOrZeroAmount,
    UnparseableDate,
    ActRequiredButMissing,
    DuplicateRejected,
    WildcardArticleMissingDecoding,
    TransferMirrorRejected,
    ActsRegisterUnavailable,
    MissingAddressForActEntry,
    MissingActNumber,
    ActNotFoundInRegister,
    RegisterNotReady,
    AlreadyPaidOut
}

impl RowError {
    pub fn kind(&self) -> RowErrorKind {
        match self {
            RowError::MissingClassification => RowErrorKind::MissingClassification,
            RowError::MissingWallet => RowErrorKind::MissingWallet,
            RowError::MissingOrZeroAmount => RowErrorKind::MissingOrZeroAmount,
            RowError::UnparseableDate { .. } => RowErrorKind::UnparseableDate,
            RowError::ActRequiredButMissing { .. } => RowErrorKind::ActRequiredButMissing,
            RowError::DuplicateRejected { .. } => RowErrorKind::DuplicateRejected,
            RowError::WildcardArticleMissingDecoding { .. } => RowErrorKind::WildcardArticleMissingDecoding,
            RowError::TransferMirrorRejected { .. } => RowErrorKind::TransferMirrorRejected,
            RowError::ActsRegisterUnavailable { .. } => RowErrorKind::ActsRegisterUnavailable,
            RowError::MissingAddressForActEntry { .. } => RowErrorKind::MissingAddressForActEntry,
            RowError::MissingActNumber { .. } => RowErrorKind::MissingActNumber,
            RowError::ActNotFoundInRegister { .. } => RowErrorKind::ActNotFoundInRegister,
            RowError::RegisterNotReady => RowErrorKind::RegisterNotReady,
            RowError::AlreadyPaidOut { .. } => RowErrorKind::AlreadyPaidOut
        }
    }
}

impl Display for RowErrorKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        let label = match self {
            RowErrorKind::MissingClassification => "no type/category/article",
            RowErrorKind::MissingWallet => "no wallet",
            RowErrorKind::MissingOrZeroAmount => "no amount or zero",
            RowErrorKind::UnparseableDate => "unreadable date",
            RowErrorKind::ActRequiredButMissing => "act reference missing",
            RowErrorKind::DuplicateRejected => "duplicates",
            RowErrorKind::WildcardArticleMissingDecoding => "decoding missing",
            RowErrorKind::TransferMirrorRejected => "invalid transfer wallet",
            RowErrorKind::ActsRegisterUnavailable => "acts register unavailable",
            RowErrorKind::MissingAddressForActEntry => "act address missing",
            RowErrorKind::MissingActNumber => "act number missing",
            RowErrorKind::ActNotFoundInRegister => "act not found",
            RowErrorKind::RegisterNotReady => "acts register not ready",
            RowErrorKind::AlreadyPaidOut => "already paid out"
        };
        write!(formatter, "{label}")
    }
}
