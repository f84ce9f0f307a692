//! Trait interfaces for the Tranche custody engine.
//!
//! These traits are the seams between the accounting core and the outside:
//! - [`AssetLedger`]: balances and transfers of fungible assets (consumed capability)
//! - [`VestingCurve`]: pure unlock curve math (tranche-vesting implements)
//! - [`Clock`]: the monotonically non-decreasing time source

use crate::error::{ArithmeticError, LedgerError};
use crate::types::{Address, Amount, Asset, Timestamp};

/// Balance and transfer primitive for fungible assets.
///
/// The ledger is shared: vesting accounts and distributors read their own
/// holdings and move funds out of them, but never own the ledger. Native
/// currency is the [`Asset::Native`] case of the same interface.
pub trait AssetLedger: Send + Sync {
    /// Current balance of `asset` held by `holder`.
    fn balance_of(&self, holder: &Address, asset: &Asset) -> Amount;

    /// Move `amount` of `asset` from `from` to `to`.
    ///
    /// Either the whole amount moves or nothing does.
    fn transfer(
        &self,
        asset: &Asset,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError>;

    /// Move several amounts of `asset` out of `from` as one unit.
    ///
    /// All-or-nothing: if any leg would fail, no balance changes.
    fn transfer_batch(
        &self,
        asset: &Asset,
        from: &Address,
        payments: &[(Address, Amount)],
    ) -> Result<(), LedgerError>;
}

/// Pure computation of the cumulative amount unlocked by a vesting curve.
///
/// All math is integer-only with truncating division.
pub trait VestingCurve: Send + Sync {
    /// Portion of `allocation` vested after `elapsed` seconds.
    ///
    /// Must return 0 at `elapsed = 0`, never exceed `allocation`, and be
    /// non-decreasing in `elapsed` for a fixed allocation.
    fn vested_amount(&self, allocation: Amount, elapsed: u64) -> Result<Amount, ArithmeticError>;

    /// Elapsed time after which the whole allocation is vested, if finite.
    fn full_vest_after(&self) -> Option<u64>;

    /// Portion of `allocation` still locked after `elapsed` seconds.
    ///
    /// Default implementation: `allocation - vested_amount(...)`.
    fn unvested_amount(&self, allocation: Amount, elapsed: u64) -> Result<Amount, ArithmeticError> {
        let vested = self.vested_amount(allocation, elapsed)?;
        allocation
            .checked_sub(vested)
            .ok_or(ArithmeticError::Overflow)
    }
}

/// Source of the current time in seconds.
pub trait Clock: Send + Sync {
    /// The current reading. Successive calls never go backwards.
    fn now(&self) -> Timestamp;
}
