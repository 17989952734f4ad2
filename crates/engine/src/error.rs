//! The module contains the errors the engine can throw.
//!
//! The balance pipeline itself only produces three of them:
//!
//! - [`DataUnavailable`] when the ledger facts could not be retrieved.
//! - [`LedgerImbalance`] when the facts do not sum to zero.
//! - [`InvalidMoney`] when an amount is non-finite or unparseable.
//!
//! The others belong to the recording side (expenses and settlements).
//!
//!  [`DataUnavailable`]: EngineError::DataUnavailable
//!  [`LedgerImbalance`]: EngineError::LedgerImbalance
//!  [`InvalidMoney`]: EngineError::InvalidMoney
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Ledger data unavailable: {0}")]
    DataUnavailable(String),
    #[error("Ledger imbalance: {0}")]
    LedgerImbalance(String),
    #[error("Invalid money: {0}")]
    InvalidMoney(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid expense: {0}")]
    InvalidExpense(String),
    #[error("Invalid settlement: {0}")]
    InvalidSettlement(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::DataUnavailable(a), Self::DataUnavailable(b)) => a == b,
            (Self::LedgerImbalance(a), Self::LedgerImbalance(b)) => a == b,
            (Self::InvalidMoney(a), Self::InvalidMoney(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidExpense(a), Self::InvalidExpense(b)) => a == b,
            (Self::InvalidSettlement(a), Self::InvalidSettlement(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
