//! Error types for the service layer.
use thiserror::Error;

use tranche_core::error::{ArithmeticError, CustodyError, LedgerError};
use tranche_core::types::Address;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("no instance registered at {0}")]
    UnknownInstance(Address),
    #[error("an instance is already registered at {0}")]
    DuplicateInstance(Address),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("logging already initialised: {0}")]
    Logging(String),
    /// Seeding a funding entry into the ledger failed.
    #[error("funding failed: {0}")]
    Funding(LedgerError),
    #[error(transparent)]
    Custody(#[from] CustodyError),
}

impl From<config::ConfigError> for ServiceError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<ArithmeticError> for ServiceError {
    fn from(e: ArithmeticError) -> Self {
        Self::Custody(CustodyError::Arithmetic(e))
    }
}
