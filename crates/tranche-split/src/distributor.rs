//! Pro-rata distributor over a [`ShareRegistry`].
//!
//! A sweep settles every registered payee at once:
//!
//! ```text
//! total_received = balance + total_released
//! entitlement(p) = ⌊total_received * shares(p) / total_shares⌋
//! payment(p)     = entitlement(p) - released(p)      (skipped when <= 0)
//! ```
//!
//! Release counters are kept per `(asset, payee)` and survive removal of
//! the payee, so a removed and re-added payee cannot claim twice.
//!
//! After a share change the re-split can owe more than the distributor
//! holds. Payments are then planned in registration order against the
//! remaining balance and any payment the balance cannot cover is skipped,
//! exactly like a zero payment; it stays owed and is paid by a later sweep.
//!
//! The sweep is all-or-nothing: counters are committed, the whole batch is
//! handed to the ledger as one transfer, and every counter is restored from
//! a snapshot if the ledger refuses.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use tranche_core::error::{ensure_caller, ensure_nonzero, CustodyError};
use tranche_core::event::{CustodyEvent, EventLog};
use tranche_core::math::{add, mul_div};
use tranche_core::traits::AssetLedger;
use tranche_core::types::{Address, Amount, Asset, Shares};

use crate::registry::{PayeeConfig, ShareRegistry};

/// Construction parameters of a distributor.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DistributorConfig {
    /// Ledger address at which the distributor holds its funds.
    pub address: Address,
    /// Admin identity allowed to manage payees.
    pub controller: Address,
    /// Initial payees, in iteration order.
    #[serde(default)]
    pub payees: Vec<PayeeConfig>,
}

/// One leg of a sweep.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payment {
    pub payee: Address,
    pub amount: Amount,
}

/// Share-weighted splitter of everything it receives.
#[derive(Debug, Clone)]
pub struct Distributor {
    address: Address,
    registry: ShareRegistry,
    /// asset → payee → amount paid. Entries are never removed.
    released: HashMap<Asset, HashMap<Address, Amount>>,
    total_released: HashMap<Asset, Amount>,
    events: EventLog,
}

impl Distributor {
    pub fn new(config: DistributorConfig) -> Result<Self, CustodyError> {
        ensure_nonzero(&config.address, "distributor address")?;
        if config.payees.iter().any(|p| p.address == config.address) {
            return Err(CustodyError::invalid("payee is the distributor itself"));
        }
        let registry = ShareRegistry::new(config.controller, &config.payees)?;
        Ok(Self {
            address: config.address,
            registry,
            released: HashMap::new(),
            total_released: HashMap::new(),
            events: EventLog::new(),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn registry(&self) -> &ShareRegistry {
        &self.registry
    }

    pub fn controller(&self) -> Address {
        self.registry.controller()
    }

    pub fn shares(&self, payee: &Address) -> Shares {
        self.registry.shares(payee)
    }

    pub fn total_shares(&self) -> Shares {
        self.registry.total_shares()
    }

    pub fn payees(&self) -> &[Address] {
        self.registry.payees()
    }

    /// Amount of `asset` ever paid to `payee`, registered or not.
    pub fn released(&self, asset: &Asset, payee: &Address) -> Amount {
        self.released
            .get(asset)
            .and_then(|m| m.get(payee))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_released(&self, asset: &Asset) -> Amount {
        self.total_released.get(asset).copied().unwrap_or(0)
    }

    /// Everything this distributor has ever received of `asset`.
    pub fn total_received<L: AssetLedger + ?Sized>(
        &self,
        ledger: &L,
        asset: &Asset,
    ) -> Result<Amount, CustodyError> {
        let balance = ledger.balance_of(&self.address, asset);
        Ok(add(balance, self.total_released(asset))?)
    }

    /// Amount owed to `payee` under the current shares.
    ///
    /// 0 for unregistered payees and for payees already paid at or above
    /// their current entitlement. A sweep pays it once the distributor's
    /// balance covers it.
    pub fn pending_payment<L: AssetLedger + ?Sized>(
        &self,
        ledger: &L,
        asset: &Asset,
        payee: &Address,
    ) -> Result<Amount, CustodyError> {
        let total_shares = self.registry.total_shares();
        let shares = self.registry.shares(payee);
        if total_shares == 0 || shares == 0 {
            return Ok(0);
        }
        let total_received = self.total_received(ledger, asset)?;
        self.due(asset, payee, shares, total_received, total_shares)
    }

    /// Payments the next sweep would make, in registration order.
    ///
    /// A payment larger than what is left of the balance after the earlier
    /// payments is left out.
    pub fn preview_release<L: AssetLedger + ?Sized>(
        &self,
        ledger: &L,
        asset: &Asset,
    ) -> Result<Vec<Payment>, CustodyError> {
        let total_shares = self.registry.total_shares();
        if total_shares == 0 {
            return Err(CustodyError::NoShares);
        }
        let balance = ledger.balance_of(&self.address, asset);
        let total_received = add(balance, self.total_released(asset))?;

        let mut remaining = balance;
        let mut payments = Vec::new();
        for payee in self.registry.payees() {
            let shares = self.registry.shares(payee);
            let amount = self.due(asset, payee, shares, total_received, total_shares)?;
            if amount == 0 {
                continue;
            }
            if amount > remaining {
                debug!(
                    distributor = %self.address,
                    %asset,
                    %payee,
                    amount,
                    remaining,
                    "split: payment exceeds balance, deferred"
                );
                continue;
            }
            remaining -= amount;
            payments.push(Payment {
                payee: *payee,
                amount,
            });
        }
        Ok(payments)
    }

    /// Sweep: pay every registered payee what it is owed in `asset`.
    /// Permissionless.
    ///
    /// Returns the payments made (empty when nobody is owed anything or
    /// nothing owed fits the balance). Fails with [`CustodyError::NoShares`]
    /// on an empty registry; if the ledger refuses any leg, no payee is paid
    /// and no counter changes.
    pub fn release<L: AssetLedger + ?Sized>(
        &mut self,
        ledger: &L,
        asset: &Asset,
    ) -> Result<Vec<Payment>, CustodyError> {
        let payments = self.preview_release(ledger, asset)?;
        if payments.is_empty() {
            debug!(distributor = %self.address, %asset, "split: nothing to release");
            return Ok(payments);
        }

        // Compute every new counter before mutating anything.
        let prev_total = self.total_released.get(asset).copied();
        let mut new_total = self.total_released(asset);
        let mut snapshot = Vec::with_capacity(payments.len());
        let mut updates = Vec::with_capacity(payments.len());
        for p in &payments {
            let prev = self.released.get(asset).and_then(|m| m.get(&p.payee)).copied();
            snapshot.push((p.payee, prev));
            updates.push((p.payee, add(prev.unwrap_or(0), p.amount)?));
            new_total = add(new_total, p.amount)?;
        }

        // Effects before interaction.
        let per_payee = self.released.entry(*asset).or_default();
        for (payee, value) in &updates {
            per_payee.insert(*payee, *value);
        }
        self.total_released.insert(*asset, new_total);

        let legs: Vec<(Address, Amount)> = payments.iter().map(|p| (p.payee, p.amount)).collect();
        if let Err(e) = ledger.transfer_batch(asset, &self.address, &legs) {
            self.restore(asset, prev_total, &snapshot);
            warn!(distributor = %self.address, %asset, error = %e, "split: sweep rolled back");
            return Err(CustodyError::TransferFailed(e));
        }

        for p in &payments {
            debug!(distributor = %self.address, %asset, payee = %p.payee, amount = p.amount, "split: payment");
            self.events.push(CustodyEvent::PaymentReleased {
                asset: *asset,
                payee: p.payee,
                amount: p.amount,
            });
        }
        info!(
            distributor = %self.address,
            %asset,
            payees = payments.len(),
            total_released = new_total,
            "split: sweep settled"
        );
        Ok(payments)
    }

    /// Register a payee. Controller only. Release history is unaffected.
    pub fn add_payee(
        &mut self,
        caller: &Address,
        payee: Address,
        shares: Shares,
    ) -> Result<(), CustodyError> {
        ensure_caller(caller, &self.registry.controller())?;
        if payee == self.address {
            return Err(CustodyError::invalid("payee is the distributor itself"));
        }
        self.registry.add_payee(caller, payee, shares)?;
        info!(distributor = %self.address, %payee, shares, "split: payee added");
        self.events.push(CustodyEvent::PayeeAdded { payee, shares });
        Ok(())
    }

    /// Unregister a payee. Controller only. Its release counters are kept.
    pub fn remove_payee(&mut self, caller: &Address, payee: &Address) -> Result<(), CustodyError> {
        let shares = self.registry.remove_payee(caller, payee)?;
        info!(distributor = %self.address, %payee, shares, "split: payee removed");
        self.events.push(CustodyEvent::PayeeRemoved { payee: *payee });
        Ok(())
    }

    /// Change a payee's shares. Controller only.
    pub fn adjust_share(
        &mut self,
        caller: &Address,
        payee: &Address,
        new_shares: Shares,
    ) -> Result<(), CustodyError> {
        let old = self.registry.adjust_share(caller, payee, new_shares)?;
        info!(distributor = %self.address, %payee, old, new = new_shares, "split: share adjusted");
        self.events.push(CustodyEvent::ShareAdjusted {
            payee: *payee,
            old,
            new: new_shares,
        });
        Ok(())
    }

    /// Hand the controller role to `new_controller`. Controller only.
    pub fn transfer_control(
        &mut self,
        caller: &Address,
        new_controller: Address,
    ) -> Result<(), CustodyError> {
        let old = self.registry.transfer_control(caller, new_controller)?;
        info!(distributor = %self.address, %old, new = %new_controller, "split: control transferred");
        self.events.push(CustodyEvent::OwnershipTransferred {
            old,
            new: new_controller,
        });
        Ok(())
    }

    pub fn events(&self) -> &[CustodyEvent] {
        self.events.pending()
    }

    pub fn drain_events(&mut self) -> Vec<CustodyEvent> {
        self.events.drain()
    }

    fn due(
        &self,
        asset: &Asset,
        payee: &Address,
        shares: Shares,
        total_received: Amount,
        total_shares: Shares,
    ) -> Result<Amount, CustodyError> {
        let entitlement = mul_div(total_received, shares as Amount, total_shares as Amount)?;
        Ok(entitlement.saturating_sub(self.released(asset, payee)))
    }

    fn restore(
        &mut self,
        asset: &Asset,
        prev_total: Option<Amount>,
        snapshot: &[(Address, Option<Amount>)],
    ) {
        if let Some(per_payee) = self.released.get_mut(asset) {
            for (payee, prev) in snapshot {
                match prev {
                    Some(v) => {
                        per_payee.insert(*payee, *v);
                    }
                    None => {
                        per_payee.remove(payee);
                    }
                }
            }
            if per_payee.is_empty() {
                self.released.remove(asset);
            }
        }
        match prev_total {
            Some(v) => {
                self.total_released.insert(*asset, v);
            }
            None => {
                self.total_released.remove(asset);
            }
        }
    }
}
