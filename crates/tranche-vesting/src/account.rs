//! Per-beneficiary vesting account.
//!
//! A [`VestingAccount`] holds assets at its own ledger address and lets its
//! beneficiary withdraw whatever the schedule has unlocked. The allocation is
//! never fixed up front: it is recomputed on every read as
//! `balance + released`, so any later deposit joins the same curve.
//!
//! Invariant, for every asset and every `t >= start`:
//! `released <= vested_amount(t) <= balance + released`.
//!
//! `release` bumps the counter before calling out to the ledger and restores
//! it if the transfer fails, so the counter and the payout move together.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use tranche_core::error::{ensure_caller, ensure_nonzero, CustodyError};
use tranche_core::event::{CustodyEvent, EventLog};
use tranche_core::math::add;
use tranche_core::traits::{AssetLedger, VestingCurve};
use tranche_core::types::{Address, Amount, Asset, Timestamp};

use crate::schedule::Schedule;

/// Construction parameters of a vesting account.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VestingConfig {
    /// Ledger address at which the account holds its funds.
    pub address: Address,
    /// Admin identity allowed to change the beneficiary or renounce.
    pub owner: Address,
    pub beneficiary: Address,
    /// Vesting start, in clock seconds.
    pub start: Timestamp,
    pub schedule: Schedule,
}

/// Vesting wallet for a single beneficiary over any number of assets.
#[derive(Debug, Clone)]
pub struct VestingAccount {
    address: Address,
    owner: Address,
    beneficiary: Address,
    start: Timestamp,
    schedule: Schedule,
    /// Per-asset amount already paid out. Only ever grows.
    released: HashMap<Asset, Amount>,
    events: EventLog,
}

impl VestingAccount {
    /// Create an account from validated configuration.
    pub fn new(config: VestingConfig) -> Result<Self, CustodyError> {
        ensure_nonzero(&config.address, "account address")?;
        ensure_nonzero(&config.owner, "owner")?;
        ensure_nonzero(&config.beneficiary, "beneficiary")?;
        if config.beneficiary == config.address {
            return Err(CustodyError::invalid("beneficiary is the account itself"));
        }
        config.schedule.validate()?;

        Ok(Self {
            address: config.address,
            owner: config.owner,
            beneficiary: config.beneficiary,
            start: config.start,
            schedule: config.schedule,
            released: HashMap::new(),
            events: EventLog::new(),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn beneficiary(&self) -> Address {
        self.beneficiary
    }

    pub fn start(&self) -> Timestamp {
        self.start
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Time at which everything received so far is vested, if the schedule ends.
    pub fn end(&self) -> Option<Timestamp> {
        self.schedule
            .full_vest_after()
            .map(|d| self.start.saturating_add(d))
    }

    /// Amount of `asset` already paid to beneficiaries (0 if never touched).
    pub fn released(&self, asset: &Asset) -> Amount {
        self.released.get(asset).copied().unwrap_or(0)
    }

    /// Everything this account has ever received of `asset`.
    pub fn total_received<L: AssetLedger + ?Sized>(
        &self,
        ledger: &L,
        asset: &Asset,
    ) -> Result<Amount, CustodyError> {
        let balance = ledger.balance_of(&self.address, asset);
        Ok(add(balance, self.released(asset))?)
    }

    /// Cumulative amount of `asset` vested at time `at`.
    ///
    /// Zero for any `at` before `start`.
    pub fn vested_amount<L: AssetLedger + ?Sized>(
        &self,
        ledger: &L,
        asset: &Asset,
        at: Timestamp,
    ) -> Result<Amount, CustodyError> {
        let allocation = self.total_received(ledger, asset)?;
        let elapsed = at.saturating_sub(self.start);
        Ok(self.schedule.vested_amount(allocation, elapsed)?)
    }

    /// Amount of `asset` the beneficiary could withdraw at `now`.
    ///
    /// Saturates at zero: after a renounce the shrunken allocation can vest
    /// to less than what was already released.
    pub fn releasable<L: AssetLedger + ?Sized>(
        &self,
        ledger: &L,
        asset: &Asset,
        now: Timestamp,
    ) -> Result<Amount, CustodyError> {
        let vested = self.vested_amount(ledger, asset, now)?;
        Ok(vested.saturating_sub(self.released(asset)))
    }

    /// Pay the beneficiary everything releasable at `now`. Permissionless.
    ///
    /// Returns the amount paid; 0 is a successful no-op. On transfer failure
    /// the released counter is restored and the error returned.
    pub fn release<L: AssetLedger + ?Sized>(
        &mut self,
        ledger: &L,
        asset: &Asset,
        now: Timestamp,
    ) -> Result<Amount, CustodyError> {
        let amount = self.releasable(ledger, asset, now)?;
        if amount == 0 {
            debug!(account = %self.address, %asset, "vesting: nothing releasable");
            return Ok(0);
        }

        let previous = self.released(asset);
        let updated = add(previous, amount)?;

        // Effects before interaction.
        self.released.insert(*asset, updated);
        if let Err(e) = ledger.transfer(asset, &self.address, &self.beneficiary, amount) {
            self.released.insert(*asset, previous);
            warn!(account = %self.address, %asset, amount, error = %e, "vesting: release rolled back");
            return Err(CustodyError::TransferFailed(e));
        }

        info!(
            account = %self.address,
            beneficiary = %self.beneficiary,
            %asset,
            amount,
            released = updated,
            "vesting: released"
        );
        self.events.push(CustodyEvent::Released {
            asset: *asset,
            amount,
        });
        Ok(amount)
    }

    /// Redirect future releases to `new_beneficiary`. Owner only.
    ///
    /// Released counters are untouched.
    pub fn change_beneficiary(
        &mut self,
        caller: &Address,
        new_beneficiary: Address,
    ) -> Result<(), CustodyError> {
        ensure_caller(caller, &self.owner)?;
        ensure_nonzero(&new_beneficiary, "beneficiary")?;
        if new_beneficiary == self.address {
            return Err(CustodyError::invalid("beneficiary is the account itself"));
        }

        let old = std::mem::replace(&mut self.beneficiary, new_beneficiary);
        info!(account = %self.address, %old, new = %new_beneficiary, "vesting: beneficiary changed");
        self.events.push(CustodyEvent::BeneficiaryChanged {
            old,
            new: new_beneficiary,
        });
        Ok(())
    }

    /// Claw back the entire balance of `asset` to the owner. Owner only.
    ///
    /// Forfeits both vested-but-unreleased and still-locked funds. The
    /// released counter keeps its historical value, so a later `release`
    /// pays nothing until new funds arrive. Returns the amount recovered.
    pub fn renounce_vesting<L: AssetLedger + ?Sized>(
        &mut self,
        ledger: &L,
        caller: &Address,
        asset: &Asset,
    ) -> Result<Amount, CustodyError> {
        ensure_caller(caller, &self.owner)?;

        let amount = ledger.balance_of(&self.address, asset);
        if amount == 0 {
            debug!(account = %self.address, %asset, "vesting: nothing to renounce");
            return Ok(0);
        }
        ledger
            .transfer(asset, &self.address, &self.owner, amount)
            .map_err(CustodyError::TransferFailed)?;

        warn!(account = %self.address, owner = %self.owner, %asset, amount, "vesting: renounced");
        self.events.push(CustodyEvent::VestingRenounced {
            asset: *asset,
            amount,
            to: self.owner,
        });
        Ok(amount)
    }

    /// Hand the owner role to `new_owner`. Owner only.
    pub fn transfer_ownership(
        &mut self,
        caller: &Address,
        new_owner: Address,
    ) -> Result<(), CustodyError> {
        ensure_caller(caller, &self.owner)?;
        ensure_nonzero(&new_owner, "owner")?;

        let old = std::mem::replace(&mut self.owner, new_owner);
        info!(account = %self.address, %old, new = %new_owner, "vesting: ownership transferred");
        self.events.push(CustodyEvent::OwnershipTransferred {
            old,
            new: new_owner,
        });
        Ok(())
    }

    /// Events committed since the last drain.
    pub fn events(&self) -> &[CustodyEvent] {
        self.events.pending()
    }

    pub fn drain_events(&mut self) -> Vec<CustodyEvent> {
        self.events.drain()
    }
}
