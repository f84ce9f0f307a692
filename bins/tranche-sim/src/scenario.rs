//! Built-in simulation used when no configuration file is given.
//!
//! Four halving-decay ratchets (four-year half-life, twelve-year cutoff)
//! hold 10%, 15%, 25%, and 50% of a 503,370,000-token supply with 18
//! decimals. They start 0, 12, 18, and 24 months after genesis and all pay
//! one distributor that splits evenly between two payees.

use tranche_core::constants::{SECONDS_PER_DAY, SECONDS_PER_YEAR};
use tranche_core::types::{Address, Asset, Timestamp};
use tranche_service::{FundingConfig, ServiceConfig};
use tranche_split::{DistributorConfig, PayeeConfig};
use tranche_vesting::{Schedule, VestingConfig};

pub const GENESIS: Timestamp = 1_700_000_000;

const HALF_LIFE: u64 = 4 * SECONDS_PER_YEAR;
const MONTH: u64 = 30 * SECONDS_PER_DAY;
const DECIMALS: u32 = 18;

/// `(whole tokens, start offset)` per ratchet.
const RATCHETS: [(u64, u64); 4] = [
    (50_337_000, 0),
    (75_505_500, 12 * MONTH),
    (125_842_500, 18 * MONTH),
    (251_685_000, 24 * MONTH),
];

fn addr(seed: u8) -> Address {
    Address([seed; 20])
}

pub fn default_config() -> ServiceConfig {
    let owner = addr(0xA0);
    let splitter = addr(0x5A);

    let mut cfg = ServiceConfig::default();
    for (i, (supply, offset)) in (0u8..).zip(RATCHETS) {
        let wallet = addr(0xC0 + i);
        cfg.vesting.push(VestingConfig {
            address: wallet,
            owner,
            beneficiary: splitter,
            start: GENESIS + offset,
            schedule: Schedule::halving(HALF_LIFE, Some(3 * HALF_LIFE)),
        });
        cfg.funding.push(FundingConfig {
            holder: wallet,
            asset: Asset::Native,
            amount: supply,
            decimals: DECIMALS,
        });
    }
    cfg.distributors.push(DistributorConfig {
        address: splitter,
        controller: owner,
        payees: vec![
            PayeeConfig { address: addr(1), shares: 100 },
            PayeeConfig { address: addr(2), shares: 100 },
        ],
    });
    cfg
}
