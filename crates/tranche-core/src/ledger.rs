//! Thread-safe in-memory [`AssetLedger`].
//!
//! Backs tests, simulations, and any embedding that does not bring its own
//! ledger. Balances live behind one `RwLock` so that a batch transfer is
//! validated and applied under a single write guard; recipients can be
//! marked as refusing transfers to exercise failure paths.

use std::collections::HashMap;

use dashmap::DashSet;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::LedgerError;
use crate::traits::AssetLedger;
use crate::types::{Address, Amount, Asset};

/// In-memory balances keyed by `(holder, asset)`.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    balances: RwLock<HashMap<(Address, Asset), Amount>>,
    rejecting: DashSet<Address>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint `amount` of `asset` to `holder` (a deposit from outside the system).
    pub fn credit(&self, holder: &Address, asset: &Asset, amount: Amount) -> Result<(), LedgerError> {
        let mut balances = self.balances.write();
        let entry = balances.entry((*holder, *asset)).or_insert(0);
        *entry = entry.checked_add(amount).ok_or(LedgerError::Overflow)?;
        debug!(%holder, %asset, amount, "ledger: credit");
        Ok(())
    }

    /// Make every future transfer to `recipient` fail with [`LedgerError::Rejected`].
    pub fn reject_transfers_to(&self, recipient: Address) {
        self.rejecting.insert(recipient);
    }

    /// Undo [`reject_transfers_to`](Self::reject_transfers_to).
    pub fn accept_transfers_to(&self, recipient: &Address) {
        self.rejecting.remove(recipient);
    }

    /// Sum of all balances of `asset` across holders.
    pub fn total_supply(&self, asset: &Asset) -> Amount {
        self.balances
            .read()
            .iter()
            .filter(|((_, a), _)| a == asset)
            .map(|(_, amount)| *amount)
            .fold(0, Amount::saturating_add)
    }
}

impl AssetLedger for MemoryLedger {
    fn balance_of(&self, holder: &Address, asset: &Asset) -> Amount {
        self.balances
            .read()
            .get(&(*holder, *asset))
            .copied()
            .unwrap_or(0)
    }

    fn transfer(
        &self,
        asset: &Asset,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.transfer_batch(asset, from, &[(*to, amount)])
    }

    fn transfer_batch(
        &self,
        asset: &Asset,
        from: &Address,
        payments: &[(Address, Amount)],
    ) -> Result<(), LedgerError> {
        let mut balances = self.balances.write();

        // Validate every leg before touching any balance.
        let mut need: Amount = 0;
        for (to, amount) in payments {
            if self.rejecting.contains(to) {
                return Err(LedgerError::Rejected { recipient: *to });
            }
            need = need.checked_add(*amount).ok_or(LedgerError::Overflow)?;
        }
        let have = balances.get(&(*from, *asset)).copied().unwrap_or(0);
        if have < need {
            return Err(LedgerError::InsufficientBalance {
                holder: *from,
                asset: *asset,
                have,
                need,
            });
        }
        // Legs to the same recipient land together, so check their sum.
        let mut credits: HashMap<Address, Amount> = HashMap::new();
        for (to, amount) in payments {
            if to == from {
                continue;
            }
            let sum = credits.entry(*to).or_insert(0);
            *sum = sum.checked_add(*amount).ok_or(LedgerError::Overflow)?;
        }
        let mut credited = Vec::with_capacity(credits.len());
        for (to, sum) in credits {
            let current = balances.get(&(to, *asset)).copied().unwrap_or(0);
            let next = current.checked_add(sum).ok_or(LedgerError::Overflow)?;
            credited.push((to, next));
        }

        let self_legs: Amount = payments
            .iter()
            .filter(|(to, _)| to == from)
            .map(|(_, amount)| *amount)
            .sum();
        balances.insert((*from, *asset), have - need + self_legs);
        for (to, next) in credited {
            balances.insert((to, *asset), next);
        }
        debug!(%from, %asset, legs = payments.len(), total = need, "ledger: transfer");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn addr(seed: u8) -> Address {
        Address([seed; 20])
    }

    fn token() -> Asset {
        Asset::Token(addr(0xEE))
    }

    #[test]
    fn empty_balance_is_zero() {
        let ledger = MemoryLedger::new();
        assert_eq!(ledger.balance_of(&addr(1), &Asset::Native), 0);
    }

    #[test]
    fn credit_accumulates() {
        let ledger = MemoryLedger::new();
        ledger.credit(&addr(1), &token(), 10).unwrap();
        ledger.credit(&addr(1), &token(), 5).unwrap();
        assert_eq!(ledger.balance_of(&addr(1), &token()), 15);
        assert_eq!(ledger.balance_of(&addr(1), &Asset::Native), 0);
    }

    #[test]
    fn credit_overflow() {
        let ledger = MemoryLedger::new();
        ledger.credit(&addr(1), &token(), Amount::MAX).unwrap();
        assert_eq!(ledger.credit(&addr(1), &token(), 1), Err(LedgerError::Overflow));
        assert_eq!(ledger.balance_of(&addr(1), &token()), Amount::MAX);
    }

    #[test]
    fn transfer_moves_funds() {
        let ledger = MemoryLedger::new();
        ledger.credit(&addr(1), &token(), 100).unwrap();
        ledger.transfer(&token(), &addr(1), &addr(2), 40).unwrap();
        assert_eq!(ledger.balance_of(&addr(1), &token()), 60);
        assert_eq!(ledger.balance_of(&addr(2), &token()), 40);
        assert_eq!(ledger.total_supply(&token()), 100);
    }

    #[test]
    fn transfer_insufficient_leaves_balances() {
        let ledger = MemoryLedger::new();
        ledger.credit(&addr(1), &token(), 10).unwrap();
        let err = ledger.transfer(&token(), &addr(1), &addr(2), 11).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientBalance {
                holder: addr(1),
                asset: token(),
                have: 10,
                need: 11,
            }
        );
        assert_eq!(ledger.balance_of(&addr(1), &token()), 10);
        assert_eq!(ledger.balance_of(&addr(2), &token()), 0);
    }

    #[test]
    fn batch_rejected_leg_aborts_everything() {
        let ledger = MemoryLedger::new();
        ledger.credit(&addr(1), &token(), 100).unwrap();
        ledger.reject_transfers_to(addr(3));
        let err = ledger
            .transfer_batch(&token(), &addr(1), &[(addr(2), 10), (addr(3), 10)])
            .unwrap_err();
        assert_eq!(err, LedgerError::Rejected { recipient: addr(3) });
        assert_eq!(ledger.balance_of(&addr(1), &token()), 100);
        assert_eq!(ledger.balance_of(&addr(2), &token()), 0);

        ledger.accept_transfers_to(&addr(3));
        ledger
            .transfer_batch(&token(), &addr(1), &[(addr(2), 10), (addr(3), 10)])
            .unwrap();
        assert_eq!(ledger.balance_of(&addr(1), &token()), 80);
    }

    #[test]
    fn batch_overflow_across_legs_to_one_recipient() {
        let ledger = MemoryLedger::new();
        ledger.credit(&addr(1), &token(), 10).unwrap();
        ledger.credit(&addr(2), &token(), Amount::MAX - 5).unwrap();

        // Each leg fits on its own, the two together do not.
        let err = ledger
            .transfer_batch(&token(), &addr(1), &[(addr(2), 4), (addr(2), 4)])
            .unwrap_err();
        assert_eq!(err, LedgerError::Overflow);
        assert_eq!(ledger.balance_of(&addr(1), &token()), 10);
        assert_eq!(ledger.balance_of(&addr(2), &token()), Amount::MAX - 5);

        ledger
            .transfer_batch(&token(), &addr(1), &[(addr(2), 2), (addr(2), 3), (addr(1), 4)])
            .unwrap();
        assert_eq!(ledger.balance_of(&addr(1), &token()), 5);
        assert_eq!(ledger.balance_of(&addr(2), &token()), Amount::MAX);
    }

    #[test]
    fn transfer_to_self_is_neutral() {
        let ledger = MemoryLedger::new();
        ledger.credit(&addr(1), &Asset::Native, 7).unwrap();
        ledger.transfer(&Asset::Native, &addr(1), &addr(1), 7).unwrap();
        assert_eq!(ledger.balance_of(&addr(1), &Asset::Native), 7);
    }

    #[test]
    fn concurrent_transfers_conserve_supply() {
        let ledger = Arc::new(MemoryLedger::new());
        ledger.credit(&addr(1), &Asset::Native, 10_000).unwrap();
        let handles: Vec<_> = (0..8u8)
            .map(|i| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let _ = ledger.transfer(&Asset::Native, &addr(1), &addr(10 + i), 3);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(ledger.total_supply(&Asset::Native), 10_000);
        assert_eq!(ledger.balance_of(&addr(1), &Asset::Native), 10_000 - 8 * 100 * 3);
    }
}
