//! Cross-crate test suite for Tranche.
//!
//! Integration tests drive vesting accounts and distributors together over
//! a shared in-memory ledger and check that funds are conserved, never paid
//! twice, and unlocked along the expected curves.

pub mod helpers;
