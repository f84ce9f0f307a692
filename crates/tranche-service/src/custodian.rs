//! Thread-safe host for vesting accounts and distributors.
//!
//! Each instance sits behind its own `parking_lot::Mutex`, so operations on
//! one instance are serialised while different instances proceed in
//! parallel. The instance maps are `DashMap`s; a handle is cloned out of the
//! map before its mutex is taken, so no shard guard is held across a ledger
//! call. At most one instance lock is held at a time.

use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;
use tracing::info;
use tranche_core::event::CustodyEvent;
use tranche_core::traits::{AssetLedger, Clock};
use tranche_core::types::{Address, Amount, Asset, Shares, Timestamp};
use tranche_split::{Distributor, DistributorConfig, Payment};
use tranche_vesting::{VestingAccount, VestingConfig};

use crate::config::ServiceConfig;
use crate::error::ServiceError;

type Shared<T> = Arc<Mutex<T>>;

/// Owns the shared ledger and clock and every hosted instance.
pub struct Custodian<L: AssetLedger> {
    ledger: Arc<L>,
    clock: Arc<dyn Clock>,
    /// Every address claimed by an instance of either kind.
    claimed: DashSet<Address>,
    vesting: DashMap<Address, Shared<VestingAccount>>,
    distributors: DashMap<Address, Shared<Distributor>>,
}

impl<L: AssetLedger> Custodian<L> {
    pub fn new(ledger: Arc<L>, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger,
            clock,
            claimed: DashSet::new(),
            vesting: DashMap::new(),
            distributors: DashMap::new(),
        }
    }

    /// Build a custodian hosting every instance named in `config`.
    ///
    /// Funding entries are not applied here; they are ledger-specific.
    pub fn from_config(
        config: &ServiceConfig,
        ledger: Arc<L>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ServiceError> {
        let custodian = Self::new(ledger, clock);
        for v in &config.vesting {
            custodian.register_vesting(v.clone())?;
        }
        for d in &config.distributors {
            custodian.register_distributor(d.clone())?;
        }
        Ok(custodian)
    }

    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    // --- registration ---

    pub fn register_vesting(&self, config: VestingConfig) -> Result<(), ServiceError> {
        let account = VestingAccount::new(config)?;
        let address = account.address();
        self.claim(address)?;
        info!(%address, beneficiary = %account.beneficiary(), "custodian: vesting account registered");
        self.vesting.insert(address, Arc::new(Mutex::new(account)));
        Ok(())
    }

    pub fn register_distributor(&self, config: DistributorConfig) -> Result<(), ServiceError> {
        let distributor = Distributor::new(config)?;
        let address = distributor.address();
        self.claim(address)?;
        info!(%address, payees = distributor.payees().len(), "custodian: distributor registered");
        self.distributors
            .insert(address, Arc::new(Mutex::new(distributor)));
        Ok(())
    }

    /// Addresses of hosted vesting accounts, sorted.
    pub fn vesting_accounts(&self) -> Vec<Address> {
        let mut out: Vec<_> = self.vesting.iter().map(|e| *e.key()).collect();
        out.sort();
        out
    }

    /// Addresses of hosted distributors, sorted.
    pub fn distributors(&self) -> Vec<Address> {
        let mut out: Vec<_> = self.distributors.iter().map(|e| *e.key()).collect();
        out.sort();
        out
    }

    /// Run `f` against the vesting account at `address` under its lock.
    pub fn with_vesting<R>(
        &self,
        address: &Address,
        f: impl FnOnce(&mut VestingAccount) -> R,
    ) -> Result<R, ServiceError> {
        let handle = self.vesting_handle(address)?;
        let mut account = handle.lock();
        Ok(f(&mut account))
    }

    /// Run `f` against the distributor at `address` under its lock.
    pub fn with_distributor<R>(
        &self,
        address: &Address,
        f: impl FnOnce(&mut Distributor) -> R,
    ) -> Result<R, ServiceError> {
        let handle = self.distributor_handle(address)?;
        let mut distributor = handle.lock();
        Ok(f(&mut distributor))
    }

    // --- vesting operations ---

    /// Release whatever the account has vested at the current clock reading.
    pub fn release_vesting(&self, account: &Address, asset: &Asset) -> Result<Amount, ServiceError> {
        let now = self.clock.now();
        let ledger = self.ledger.as_ref();
        Ok(self.with_vesting(account, |a| a.release(ledger, asset, now))??)
    }

    pub fn releasable(&self, account: &Address, asset: &Asset) -> Result<Amount, ServiceError> {
        let now = self.clock.now();
        let ledger = self.ledger.as_ref();
        Ok(self.with_vesting(account, |a| a.releasable(ledger, asset, now))??)
    }

    pub fn vested_amount(
        &self,
        account: &Address,
        asset: &Asset,
        at: Timestamp,
    ) -> Result<Amount, ServiceError> {
        let ledger = self.ledger.as_ref();
        Ok(self.with_vesting(account, |a| a.vested_amount(ledger, asset, at))??)
    }

    pub fn vesting_released(&self, account: &Address, asset: &Asset) -> Result<Amount, ServiceError> {
        self.with_vesting(account, |a| a.released(asset))
    }

    pub fn change_beneficiary(
        &self,
        account: &Address,
        caller: &Address,
        new_beneficiary: Address,
    ) -> Result<(), ServiceError> {
        Ok(self.with_vesting(account, |a| a.change_beneficiary(caller, new_beneficiary))??)
    }

    pub fn renounce_vesting(
        &self,
        account: &Address,
        caller: &Address,
        asset: &Asset,
    ) -> Result<Amount, ServiceError> {
        let ledger = self.ledger.as_ref();
        Ok(self.with_vesting(account, |a| a.renounce_vesting(ledger, caller, asset))??)
    }

    pub fn transfer_ownership(
        &self,
        account: &Address,
        caller: &Address,
        new_owner: Address,
    ) -> Result<(), ServiceError> {
        Ok(self.with_vesting(account, |a| a.transfer_ownership(caller, new_owner))??)
    }

    // --- distributor operations ---

    /// Sweep the distributor at `address` for `asset`.
    pub fn release_split(
        &self,
        distributor: &Address,
        asset: &Asset,
    ) -> Result<Vec<Payment>, ServiceError> {
        let ledger = self.ledger.as_ref();
        Ok(self.with_distributor(distributor, |d| d.release(ledger, asset))??)
    }

    pub fn pending_payment(
        &self,
        distributor: &Address,
        asset: &Asset,
        payee: &Address,
    ) -> Result<Amount, ServiceError> {
        let ledger = self.ledger.as_ref();
        Ok(self.with_distributor(distributor, |d| d.pending_payment(ledger, asset, payee))??)
    }

    pub fn split_released(
        &self,
        distributor: &Address,
        asset: &Asset,
        payee: &Address,
    ) -> Result<Amount, ServiceError> {
        self.with_distributor(distributor, |d| d.released(asset, payee))
    }

    pub fn add_payee(
        &self,
        distributor: &Address,
        caller: &Address,
        payee: Address,
        shares: Shares,
    ) -> Result<(), ServiceError> {
        Ok(self.with_distributor(distributor, |d| d.add_payee(caller, payee, shares))??)
    }

    pub fn remove_payee(
        &self,
        distributor: &Address,
        caller: &Address,
        payee: &Address,
    ) -> Result<(), ServiceError> {
        Ok(self.with_distributor(distributor, |d| d.remove_payee(caller, payee))??)
    }

    pub fn adjust_share(
        &self,
        distributor: &Address,
        caller: &Address,
        payee: &Address,
        new_shares: Shares,
    ) -> Result<(), ServiceError> {
        Ok(self.with_distributor(distributor, |d| d.adjust_share(caller, payee, new_shares))??)
    }

    pub fn transfer_control(
        &self,
        distributor: &Address,
        caller: &Address,
        new_controller: Address,
    ) -> Result<(), ServiceError> {
        Ok(self.with_distributor(distributor, |d| d.transfer_control(caller, new_controller))??)
    }

    /// Drain every instance's event journal, tagged with the instance address.
    ///
    /// Vesting accounts come first, then distributors, each in address order.
    pub fn drain_events(&self) -> Vec<(Address, CustodyEvent)> {
        let mut out = Vec::new();
        for address in self.vesting_accounts() {
            if let Ok(events) = self.with_vesting(&address, |a| a.drain_events()) {
                out.extend(events.into_iter().map(|e| (address, e)));
            }
        }
        for address in self.distributors() {
            if let Ok(events) = self.with_distributor(&address, |d| d.drain_events()) {
                out.extend(events.into_iter().map(|e| (address, e)));
            }
        }
        out
    }

    fn claim(&self, address: Address) -> Result<(), ServiceError> {
        if !self.claimed.insert(address) {
            return Err(ServiceError::DuplicateInstance(address));
        }
        Ok(())
    }

    fn vesting_handle(&self, address: &Address) -> Result<Shared<VestingAccount>, ServiceError> {
        self.vesting
            .get(address)
            .map(|e| Arc::clone(e.value()))
            .ok_or(ServiceError::UnknownInstance(*address))
    }

    fn distributor_handle(&self, address: &Address) -> Result<Shared<Distributor>, ServiceError> {
        self.distributors
            .get(address)
            .map(|e| Arc::clone(e.value()))
            .ok_or(ServiceError::UnknownInstance(*address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use tranche_core::error::CustodyError;
    use tranche_core::ledger::MemoryLedger;
    use tranche_split::PayeeConfig;
    use tranche_vesting::Schedule;

    fn addr(seed: u8) -> Address {
        Address([seed; 20])
    }

    const OWNER: u8 = 0xA0;
    const WALLET: u8 = 0xC0;
    const SPLITTER: u8 = 0x5A;

    fn setup() -> (Arc<MemoryLedger>, Arc<ManualClock>, Custodian<MemoryLedger>) {
        let ledger = Arc::new(MemoryLedger::new());
        let clock = Arc::new(ManualClock::new(0));
        let custodian = Custodian::new(Arc::clone(&ledger), clock.clone());
        custodian
            .register_vesting(VestingConfig {
                address: addr(WALLET),
                owner: addr(OWNER),
                beneficiary: addr(SPLITTER),
                start: 0,
                schedule: Schedule::linear(100),
            })
            .unwrap();
        custodian
            .register_distributor(DistributorConfig {
                address: addr(SPLITTER),
                controller: addr(OWNER),
                payees: vec![
                    PayeeConfig { address: addr(1), shares: 1 },
                    PayeeConfig { address: addr(2), shares: 1 },
                ],
            })
            .unwrap();
        (ledger, clock, custodian)
    }

    #[test]
    fn from_config_registers_everything() {
        let cfg = ServiceConfig {
            vesting: vec![VestingConfig {
                address: addr(WALLET),
                owner: addr(OWNER),
                beneficiary: addr(9),
                start: 0,
                schedule: Schedule::halving(10, None),
            }],
            distributors: vec![DistributorConfig {
                address: addr(SPLITTER),
                controller: addr(OWNER),
                payees: vec![],
            }],
            ..ServiceConfig::default()
        };
        let c = Custodian::from_config(
            &cfg,
            Arc::new(MemoryLedger::new()),
            Arc::new(ManualClock::new(0)),
        )
        .unwrap();
        assert_eq!(c.vesting_accounts(), vec![addr(WALLET)]);
        assert_eq!(c.distributors(), vec![addr(SPLITTER)]);
    }

    #[test]
    fn duplicate_address_across_kinds() {
        let (_, _, c) = setup();
        let err = c
            .register_distributor(DistributorConfig {
                address: addr(WALLET),
                controller: addr(OWNER),
                payees: vec![],
            })
            .unwrap_err();
        assert!(matches!(err, ServiceError::DuplicateInstance(a) if a == addr(WALLET)));
    }

    #[test]
    fn invalid_instance_is_not_registered() {
        let (_, _, c) = setup();
        let err = c
            .register_vesting(VestingConfig {
                address: addr(0x77),
                owner: addr(OWNER),
                beneficiary: Address::ZERO,
                start: 0,
                schedule: Schedule::linear(1),
            })
            .unwrap_err();
        assert!(matches!(err, ServiceError::Custody(CustodyError::InvalidParameter(_))));
        assert_eq!(c.vesting_accounts().len(), 1);
    }

    #[test]
    fn unknown_instance() {
        let (_, _, c) = setup();
        let err = c.release_vesting(&addr(0x99), &Asset::Native).unwrap_err();
        assert!(matches!(err, ServiceError::UnknownInstance(a) if a == addr(0x99)));
        // A vesting address is not a distributor.
        assert!(matches!(
            c.release_split(&addr(WALLET), &Asset::Native),
            Err(ServiceError::UnknownInstance(_))
        ));
    }

    #[test]
    fn vesting_follows_the_clock() {
        let (ledger, clock, c) = setup();
        ledger.credit(&addr(WALLET), &Asset::Native, 1_000).unwrap();

        assert_eq!(c.release_vesting(&addr(WALLET), &Asset::Native).unwrap(), 0);
        clock.set(25);
        assert_eq!(c.releasable(&addr(WALLET), &Asset::Native).unwrap(), 250);
        assert_eq!(c.release_vesting(&addr(WALLET), &Asset::Native).unwrap(), 250);
        assert_eq!(c.vesting_released(&addr(WALLET), &Asset::Native).unwrap(), 250);
        assert_eq!(c.vested_amount(&addr(WALLET), &Asset::Native, 100).unwrap(), 1_000);
        assert_eq!(ledger.balance_of(&addr(SPLITTER), &Asset::Native), 250);
    }

    #[test]
    fn vesting_feeds_distributor() {
        let (ledger, clock, c) = setup();
        ledger.credit(&addr(WALLET), &Asset::Native, 1_000).unwrap();
        clock.set(50);
        c.release_vesting(&addr(WALLET), &Asset::Native).unwrap();

        assert_eq!(c.pending_payment(&addr(SPLITTER), &Asset::Native, &addr(1)).unwrap(), 250);
        let paid = c.release_split(&addr(SPLITTER), &Asset::Native).unwrap();
        assert_eq!(paid.len(), 2);
        assert_eq!(ledger.balance_of(&addr(1), &Asset::Native), 250);
        assert_eq!(c.split_released(&addr(SPLITTER), &Asset::Native, &addr(2)).unwrap(), 250);
    }

    #[test]
    fn admin_calls_are_forwarded() {
        let (ledger, _, c) = setup();
        ledger.credit(&addr(WALLET), &Asset::Native, 10).unwrap();

        let denied = c.change_beneficiary(&addr(WALLET), &addr(1), addr(1));
        assert!(matches!(
            denied,
            Err(ServiceError::Custody(CustodyError::Unauthorized { .. }))
        ));
        c.change_beneficiary(&addr(WALLET), &addr(OWNER), addr(3)).unwrap();
        c.add_payee(&addr(SPLITTER), &addr(OWNER), addr(3), 2).unwrap();
        c.adjust_share(&addr(SPLITTER), &addr(OWNER), &addr(3), 4).unwrap();
        c.remove_payee(&addr(SPLITTER), &addr(OWNER), &addr(2)).unwrap();
        c.transfer_control(&addr(SPLITTER), &addr(OWNER), addr(4)).unwrap();
        assert_eq!(c.renounce_vesting(&addr(WALLET), &addr(OWNER), &Asset::Native).unwrap(), 10);
        c.transfer_ownership(&addr(WALLET), &addr(OWNER), addr(5)).unwrap();

        let payees = c.with_distributor(&addr(SPLITTER), |d| d.payees().to_vec()).unwrap();
        assert_eq!(payees, vec![addr(1), addr(3)]);
        assert_eq!(ledger.balance_of(&addr(OWNER), &Asset::Native), 10);

        let events = c.drain_events();
        assert_eq!(events.len(), 7);
        assert_eq!(events[0].0, addr(WALLET));
        assert_eq!(events[6].0, addr(SPLITTER));
        assert!(c.drain_events().is_empty());
    }

    #[test]
    fn concurrent_releases_pay_exactly_once() {
        let (ledger, clock, c) = setup();
        ledger.credit(&addr(WALLET), &Asset::Native, 1_000_000).unwrap();
        let c = Arc::new(c);
        clock.set(37);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let c = Arc::clone(&c);
                std::thread::spawn(move || {
                    let mut paid = 0;
                    for _ in 0..50 {
                        paid += c.release_vesting(&addr(WALLET), &Asset::Native).unwrap();
                        let _ = c.release_split(&addr(SPLITTER), &Asset::Native).unwrap();
                    }
                    paid
                })
            })
            .collect();
        let total: Amount = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(total, 370_000);
        assert_eq!(ledger.balance_of(&addr(WALLET), &Asset::Native), 630_000);
        assert_eq!(ledger.balance_of(&addr(1), &Asset::Native), 185_000);
        assert_eq!(ledger.balance_of(&addr(2), &Asset::Native), 185_000);
        assert_eq!(ledger.total_supply(&Asset::Native), 1_000_000);
    }
}
