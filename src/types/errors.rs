use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("Amount error: value is empty")]
    Missing,
    #[error("Amount error: '{0}' is not a number")]
    NotNumeric(String),
    #[error("Amount error: value is zero")]
    Zero
}
