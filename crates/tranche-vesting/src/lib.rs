//! # tranche-vesting — Time-gated release of a continuously funded balance.
//!
//! All calculations use integer arithmetic only.
//!
//! - **Schedules**: [`Linear`] unlocks the allocation evenly over a duration;
//!   [`HalvingDecay`] unlocks half of the still-locked remainder over each
//!   half-life, linearly within the window, with an optional cutoff after
//!   which everything is vested.
//! - **Vesting accounts**: a [`VestingAccount`] treats everything it has ever
//!   received (current balance plus already released) as the allocation, so
//!   late deposits vest on the same curve as the initial funding.

pub mod account;
pub mod schedule;

pub use account::{VestingAccount, VestingConfig};
pub use schedule::{HalvingDecay, Linear, Schedule};
