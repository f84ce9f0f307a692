//! Shared helpers for the integration tests.

use tranche_core::constants::{SECONDS_PER_DAY, SECONDS_PER_YEAR};
use tranche_core::ledger::MemoryLedger;
use tranche_core::types::{Address, Amount, Asset, Shares, Timestamp};
use tranche_split::{Distributor, DistributorConfig, PayeeConfig};
use tranche_vesting::{Schedule, VestingAccount, VestingConfig};

/// One whole token with 18 decimals.
pub const UNIT: Amount = 1_000_000_000_000_000_000;

/// Supply shared out across the staggered ratchets.
pub const TOTAL_SUPPLY: Amount = 503_370_000 * UNIT;

/// Four years.
pub const HALF_LIFE: u64 = 4 * SECONDS_PER_YEAR;

/// Thirty-day months, as used for the ratchet offsets.
pub const MONTH: u64 = 30 * SECONDS_PER_DAY;

/// Clock reading at which scenarios begin.
pub const GENESIS: Timestamp = 1_700_000_000;

pub fn addr(seed: u8) -> Address {
    Address([seed; 20])
}

pub fn owner() -> Address {
    addr(0xA0)
}

pub fn token() -> Asset {
    Asset::Token(addr(0x70))
}

/// Address of the `i`-th vesting account in a scenario.
pub fn wallet(i: u8) -> Address {
    addr(0xC0 + i)
}

pub fn splitter() -> Address {
    addr(0x5A)
}

pub fn vesting_account(
    address: Address,
    beneficiary: Address,
    start: Timestamp,
    schedule: Schedule,
) -> VestingAccount {
    VestingAccount::new(VestingConfig {
        address,
        owner: owner(),
        beneficiary,
        start,
        schedule,
    })
    .unwrap()
}

pub fn distributor(address: Address, payees: &[(Address, Shares)]) -> Distributor {
    Distributor::new(DistributorConfig {
        address,
        controller: owner(),
        payees: payees
            .iter()
            .map(|&(address, shares)| PayeeConfig { address, shares })
            .collect(),
    })
    .unwrap()
}

/// A halving-decay ratchet with its allocation and start.
#[derive(Debug, Clone, Copy)]
pub struct Ratchet {
    pub supply: Amount,
    pub start: Timestamp,
}

/// Four staggered ratchets holding 10%, 15%, 25%, and 50% of the supply,
/// starting 0, 12, 18, and 24 months after genesis.
pub fn staggered_ratchets() -> [Ratchet; 4] {
    [
        Ratchet { supply: TOTAL_SUPPLY / 10, start: GENESIS },
        Ratchet { supply: TOTAL_SUPPLY * 15 / 100, start: GENESIS + 12 * MONTH },
        Ratchet { supply: TOTAL_SUPPLY / 4, start: GENESIS + 18 * MONTH },
        Ratchet { supply: TOTAL_SUPPLY / 2, start: GENESIS + 24 * MONTH },
    ]
}

/// Fund and build the staggered ratchets, all paying `beneficiary`.
pub fn deploy_ratchets(
    ledger: &MemoryLedger,
    beneficiary: Address,
    max_duration: Option<u64>,
) -> Vec<VestingAccount> {
    staggered_ratchets()
        .iter()
        .zip(0u8..)
        .map(|(r, i)| {
            ledger.credit(&wallet(i), &token(), r.supply).unwrap();
            vesting_account(
                wallet(i),
                beneficiary,
                r.start,
                Schedule::halving(HALF_LIFE, max_duration),
            )
        })
        .collect()
}

/// Independent evaluation of the halving curve:
/// `V - (V >> k) + (V >> k) * r / (2H)`.
///
/// Only valid while `(V >> k) * r` fits in 128 bits.
pub fn halving_reference(supply: Amount, elapsed: u64, half_life: u64) -> Amount {
    let k = elapsed / half_life;
    let locked = if k >= 128 { 0 } else { supply >> k };
    let r = (elapsed % half_life) as Amount;
    supply - locked + locked * r / (2 * half_life as Amount)
}
