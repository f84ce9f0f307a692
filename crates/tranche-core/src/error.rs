//! Error types for the Tranche custody engine.
use thiserror::Error;

use crate::types::{Address, Amount, Asset};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid address: {0}")] InvalidAddress(String),
    #[error("invalid asset: {0}")] InvalidAsset(String),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticError {
    #[error("arithmetic overflow")] Overflow,
    #[error("division by zero")] DivisionByZero,
}

/// Failures reported by an [`AssetLedger`](crate::traits::AssetLedger).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("insufficient {asset} balance at {holder}: have {have}, need {need}")]
    InsufficientBalance { holder: Address, asset: Asset, have: Amount, need: Amount },
    #[error("recipient {recipient} rejected the transfer")]
    Rejected { recipient: Address },
    #[error("balance overflow")]
    Overflow,
}

/// Errors returned by vesting accounts, share registries and distributors.
///
/// A call that returns any of these has left every counter exactly as it
/// was before the call; callers may retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CustodyError {
    /// Zero address, zero shares, or an unusable schedule parameter.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("payee already registered: {0}")]
    AlreadyRegistered(Address),
    #[error("payee not registered: {0}")]
    NotRegistered(Address),
    /// A caller other than the owner/controller invoked an admin operation.
    #[error("unauthorized caller: {caller}")]
    Unauthorized { caller: Address },
    /// A sweep was attempted while the registry is empty.
    #[error("no shares registered")]
    NoShares,
    #[error("transfer failed: {0}")]
    TransferFailed(LedgerError),
    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),
}

impl CustodyError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }
}

/// Reject the zero address for the named parameter.
pub fn ensure_nonzero(addr: &Address, what: &str) -> Result<(), CustodyError> {
    if addr.is_zero() {
        return Err(CustodyError::invalid(format!("{what} is the zero address")));
    }
    Ok(())
}

/// Reject any caller that is not `expected`.
pub fn ensure_caller(caller: &Address, expected: &Address) -> Result<(), CustodyError> {
    if caller != expected {
        return Err(CustodyError::Unauthorized { caller: *caller });
    }
    Ok(())
}
