//! Observability events.
//!
//! Components append an event to their journal only after an operation has
//! committed; an operation that fails leaves no trace here. Events are not
//! needed for correctness.

use serde::{Deserialize, Serialize};

use crate::types::{Address, Amount, Asset, Shares};

/// A committed state change of a vesting account or distributor.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CustodyEvent {
    /// A vesting account paid its beneficiary.
    Released { asset: Asset, amount: Amount },
    BeneficiaryChanged { old: Address, new: Address },
    /// The owner clawed back the whole balance of `asset`.
    VestingRenounced { asset: Asset, amount: Amount, to: Address },
    OwnershipTransferred { old: Address, new: Address },
    PayeeAdded { payee: Address, shares: Shares },
    PayeeRemoved { payee: Address },
    ShareAdjusted { payee: Address, old: Shares, new: Shares },
    /// A distributor sweep paid one payee.
    PaymentReleased { asset: Asset, payee: Address, amount: Amount },
}

/// Append-only journal of committed events, drained by the embedding layer.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<CustodyEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: CustodyEvent) {
        self.events.push(event);
    }

    /// Events not yet drained, oldest first.
    pub fn pending(&self) -> &[CustodyEvent] {
        &self.events
    }

    /// Take every pending event, leaving the journal empty.
    pub fn drain(&mut self) -> Vec<CustodyEvent> {
        std::mem::take(&mut self.events)
    }
}
