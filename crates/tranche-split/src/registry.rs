//! Payee share registry.
//!
//! Rules:
//! 1. Only the controller may mutate the registry.
//! 2. The zero address is never registered; shares are always positive.
//!    Removing a payee deletes it rather than storing 0.
//! 3. `total_shares` equals the sum of registered shares after every call.
//! 4. Iteration follows registration order; re-adding a removed payee
//!    appends it at the end.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tranche_core::error::{ensure_caller, ensure_nonzero, ArithmeticError, CustodyError};
use tranche_core::types::{Address, Shares};

/// One initial payee entry.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayeeConfig {
    pub address: Address,
    pub shares: Shares,
}

/// Payee → share weight map owned by a single controller.
#[derive(Debug, Clone)]
pub struct ShareRegistry {
    controller: Address,
    shares: HashMap<Address, Shares>,
    order: Vec<Address>,
    total_shares: Shares,
}

impl ShareRegistry {
    /// Registry with the given controller and initial payees, in order.
    pub fn new(controller: Address, payees: &[PayeeConfig]) -> Result<Self, CustodyError> {
        ensure_nonzero(&controller, "controller")?;
        let mut registry = Self {
            controller,
            shares: HashMap::with_capacity(payees.len()),
            order: Vec::with_capacity(payees.len()),
            total_shares: 0,
        };
        for p in payees {
            registry.insert(p.address, p.shares)?;
        }
        Ok(registry)
    }

    pub fn controller(&self) -> Address {
        self.controller
    }

    /// Shares of `payee`, 0 if not registered.
    pub fn shares(&self, payee: &Address) -> Shares {
        self.shares.get(payee).copied().unwrap_or(0)
    }

    pub fn total_shares(&self) -> Shares {
        self.total_shares
    }

    /// Registered payees in registration order.
    pub fn payees(&self) -> &[Address] {
        &self.order
    }

    pub fn contains(&self, payee: &Address) -> bool {
        self.shares.contains_key(payee)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Register `payee` with `shares`. Controller only.
    pub fn add_payee(
        &mut self,
        caller: &Address,
        payee: Address,
        shares: Shares,
    ) -> Result<(), CustodyError> {
        ensure_caller(caller, &self.controller)?;
        self.insert(payee, shares)
    }

    /// Unregister `payee`, returning the shares it held. Controller only.
    pub fn remove_payee(&mut self, caller: &Address, payee: &Address) -> Result<Shares, CustodyError> {
        ensure_caller(caller, &self.controller)?;
        ensure_nonzero(payee, "payee")?;
        let removed = self
            .shares
            .remove(payee)
            .ok_or(CustodyError::NotRegistered(*payee))?;
        self.order.retain(|p| p != payee);
        self.total_shares -= removed;
        Ok(removed)
    }

    /// Replace the shares of a registered payee, returning the old value.
    /// Controller only. Use [`remove_payee`](Self::remove_payee) to drop to zero.
    pub fn adjust_share(
        &mut self,
        caller: &Address,
        payee: &Address,
        new_shares: Shares,
    ) -> Result<Shares, CustodyError> {
        ensure_caller(caller, &self.controller)?;
        ensure_nonzero(payee, "payee")?;
        if new_shares == 0 {
            return Err(CustodyError::invalid("shares are 0"));
        }
        let old = self.shares(payee);
        if old == 0 {
            return Err(CustodyError::NotRegistered(*payee));
        }
        let total = (self.total_shares - old)
            .checked_add(new_shares)
            .ok_or(ArithmeticError::Overflow)?;

        self.shares.insert(*payee, new_shares);
        self.total_shares = total;
        Ok(old)
    }

    /// Hand control to `new_controller`, returning the previous one.
    pub fn transfer_control(
        &mut self,
        caller: &Address,
        new_controller: Address,
    ) -> Result<Address, CustodyError> {
        ensure_caller(caller, &self.controller)?;
        ensure_nonzero(&new_controller, "controller")?;
        Ok(std::mem::replace(&mut self.controller, new_controller))
    }

    fn insert(&mut self, payee: Address, shares: Shares) -> Result<(), CustodyError> {
        ensure_nonzero(&payee, "payee")?;
        if shares == 0 {
            return Err(CustodyError::invalid("shares are 0"));
        }
        if self.contains(&payee) {
            return Err(CustodyError::AlreadyRegistered(payee));
        }
        let total = self
            .total_shares
            .checked_add(shares)
            .ok_or(ArithmeticError::Overflow)?;

        self.shares.insert(payee, shares);
        self.order.push(payee);
        self.total_shares = total;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn addr(seed: u8) -> Address {
        Address([seed; 20])
    }

    fn admin() -> Address {
        addr(0xAD)
    }

    fn alice() -> Address {
        addr(1)
    }

    fn bob() -> Address {
        addr(2)
    }

    fn carol() -> Address {
        addr(3)
    }

    fn registry(entries: &[(Address, Shares)]) -> ShareRegistry {
        let payees: Vec<PayeeConfig> = entries
            .iter()
            .map(|&(address, shares)| PayeeConfig { address, shares })
            .collect();
        ShareRegistry::new(admin(), &payees).unwrap()
    }

    fn sum_of_shares(r: &ShareRegistry) -> Shares {
        r.payees().iter().map(|p| r.shares(p)).sum()
    }

    #[test]
    fn initial_payees() {
        let r = registry(&[(alice(), 100), (bob(), 200), (carol(), 300)]);
        assert_eq!(r.shares(&alice()), 100);
        assert_eq!(r.shares(&bob()), 200);
        assert_eq!(r.shares(&carol()), 300);
        assert_eq!(r.total_shares(), 600);
        assert_eq!(r.payees(), &[alice(), bob(), carol()]);
        assert_eq!(r.len(), 3);
    }

    #[test]
    fn new_rejects_duplicates_and_zero() {
        let dup = [
            PayeeConfig { address: alice(), shares: 1 },
            PayeeConfig { address: alice(), shares: 2 },
        ];
        assert_eq!(
            ShareRegistry::new(admin(), &dup).unwrap_err(),
            CustodyError::AlreadyRegistered(alice())
        );
        assert!(ShareRegistry::new(Address::ZERO, &[]).is_err());
        let zero = [PayeeConfig { address: alice(), shares: 0 }];
        assert!(ShareRegistry::new(admin(), &zero).is_err());
    }

    #[test]
    fn empty_registry() {
        let r = registry(&[]);
        assert!(r.is_empty());
        assert_eq!(r.total_shares(), 0);
    }

    #[test]
    fn add_payee() {
        let mut r = registry(&[(alice(), 100), (bob(), 200)]);
        r.add_payee(&admin(), carol(), 100).unwrap();
        assert_eq!(r.shares(&carol()), 100);
        assert_eq!(r.total_shares(), 400);
        assert_eq!(r.payees().last(), Some(&carol()));
    }

    #[test]
    fn add_zero_shares() {
        let mut r = registry(&[(alice(), 100)]);
        assert_eq!(
            r.add_payee(&admin(), bob(), 0),
            Err(CustodyError::InvalidParameter("shares are 0".to_string()))
        );
    }

    #[test]
    fn add_zero_address() {
        let mut r = registry(&[(alice(), 100)]);
        assert!(matches!(
            r.add_payee(&admin(), Address::ZERO, 50),
            Err(CustodyError::InvalidParameter(_))
        ));
    }

    #[test]
    fn add_existing_payee() {
        let mut r = registry(&[(alice(), 100)]);
        assert_eq!(
            r.add_payee(&admin(), alice(), 5),
            Err(CustodyError::AlreadyRegistered(alice()))
        );
        assert_eq!(r.total_shares(), 100);
    }

    #[test]
    fn remove_payee() {
        let mut r = registry(&[(alice(), 100), (bob(), 200)]);
        assert_eq!(r.remove_payee(&admin(), &bob()).unwrap(), 200);
        assert_eq!(r.shares(&bob()), 0);
        assert!(!r.contains(&bob()));
        assert_eq!(r.total_shares(), 100);
        assert_eq!(r.payees(), &[alice()]);
    }

    #[test]
    fn remove_nonexistent_payee() {
        let mut r = registry(&[(alice(), 100)]);
        assert_eq!(
            r.remove_payee(&admin(), &bob()),
            Err(CustodyError::NotRegistered(bob()))
        );
    }

    #[test]
    fn remove_zero_address() {
        let mut r = registry(&[(alice(), 100)]);
        assert!(matches!(
            r.remove_payee(&admin(), &Address::ZERO),
            Err(CustodyError::InvalidParameter(_))
        ));
    }

    #[test]
    fn adjust_payee_shares() {
        let mut r = registry(&[(alice(), 100), (bob(), 200), (carol(), 300)]);
        assert_eq!(r.adjust_share(&admin(), &bob(), 100).unwrap(), 200);
        assert_eq!(r.shares(&bob()), 100);
        assert_eq!(r.total_shares(), 500);
        assert_eq!(r.payees(), &[alice(), bob(), carol()]);
    }

    #[test]
    fn adjust_to_zero() {
        let mut r = registry(&[(alice(), 100), (bob(), 200)]);
        assert_eq!(
            r.adjust_share(&admin(), &bob(), 0),
            Err(CustodyError::InvalidParameter("shares are 0".to_string()))
        );
        assert_eq!(r.shares(&bob()), 200);
    }

    #[test]
    fn adjust_nonexistent_payee() {
        let mut r = registry(&[(alice(), 100)]);
        assert_eq!(
            r.adjust_share(&admin(), &bob(), 100),
            Err(CustodyError::NotRegistered(bob()))
        );
    }

    #[test]
    fn adjust_zero_address() {
        let mut r = registry(&[(alice(), 100)]);
        assert!(matches!(
            r.adjust_share(&admin(), &Address::ZERO, 50),
            Err(CustodyError::InvalidParameter(_))
        ));
    }

    #[test]
    fn readd_payee_goes_to_back() {
        let mut r = registry(&[(alice(), 100), (bob(), 200)]);
        r.remove_payee(&admin(), &alice()).unwrap();
        r.add_payee(&admin(), alice(), 200).unwrap();
        assert_eq!(r.payees(), &[bob(), alice()]);
        assert_eq!(r.total_shares(), 400);
        assert_eq!(
            r.add_payee(&admin(), alice(), 200),
            Err(CustodyError::AlreadyRegistered(alice()))
        );
    }

    #[test]
    fn admin_functions_only_by_controller() {
        let mut r = registry(&[(alice(), 100)]);
        let denied = CustodyError::Unauthorized { caller: bob() };
        assert_eq!(r.add_payee(&bob(), bob(), 50), Err(denied.clone()));
        assert_eq!(r.remove_payee(&bob(), &alice()), Err(denied.clone()));
        assert_eq!(r.adjust_share(&bob(), &alice(), 50), Err(denied.clone()));
        assert_eq!(r.transfer_control(&bob(), bob()), Err(denied));
        assert_eq!(r.shares(&alice()), 100);
    }

    #[test]
    fn unauthorized_checked_before_parameters() {
        let mut r = registry(&[(alice(), 100)]);
        assert_eq!(
            r.add_payee(&bob(), Address::ZERO, 0),
            Err(CustodyError::Unauthorized { caller: bob() })
        );
    }

    #[test]
    fn transfer_control() {
        let mut r = registry(&[(alice(), 100)]);
        assert_eq!(r.transfer_control(&admin(), carol()).unwrap(), admin());
        assert_eq!(r.controller(), carol());
        assert!(r.add_payee(&admin(), bob(), 1).is_err());
        r.add_payee(&carol(), bob(), 1).unwrap();
    }

    #[test]
    fn share_total_overflow_is_rejected() {
        let mut r = registry(&[(alice(), Shares::MAX - 1)]);
        assert_eq!(
            r.add_payee(&admin(), bob(), 2),
            Err(CustodyError::Arithmetic(ArithmeticError::Overflow))
        );
        assert_eq!(
            r.adjust_share(&admin(), &alice(), Shares::MAX).unwrap(),
            Shares::MAX - 1
        );
        assert_eq!(r.total_shares(), Shares::MAX);
        assert!(!r.contains(&bob()));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(u8, Shares),
        Remove(u8),
        Adjust(u8, Shares),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..8, 0u64..1_000).prop_map(|(p, s)| Op::Add(p, s)),
            (0u8..8).prop_map(Op::Remove),
            (0u8..8, 0u64..1_000).prop_map(|(p, s)| Op::Adjust(p, s)),
        ]
    }

    proptest! {
        #[test]
        fn share_sum_invariant(ops in proptest::collection::vec(op(), 0..64)) {
            let mut r = registry(&[]);
            for op in ops {
                let before = r.clone();
                let res = match op {
                    Op::Add(p, s) => r.add_payee(&admin(), addr(p), s),
                    Op::Remove(p) => r.remove_payee(&admin(), &addr(p)).map(|_| ()),
                    Op::Adjust(p, s) => r.adjust_share(&admin(), &addr(p), s).map(|_| ()),
                };
                if res.is_err() {
                    prop_assert_eq!(r.payees(), before.payees());
                    prop_assert_eq!(r.total_shares(), before.total_shares());
                }
                prop_assert_eq!(r.total_shares(), sum_of_shares(&r));
                prop_assert!(r.payees().iter().all(|p| r.shares(p) > 0 && !p.is_zero()));
                let mut unique = r.payees().to_vec();
                unique.sort();
                unique.dedup();
                prop_assert_eq!(unique.len(), r.len());
            }
        }
    }
}
