//! # tranche-core
//! Foundation types and traits for the Tranche custody engine.
//!
//! - [`types`] — addresses, assets and the integer units everything is counted in
//! - [`error`] — error taxonomy shared by every component
//! - [`math`] — exact, overflow-checked integer helpers
//! - [`traits`] — capability seams (`AssetLedger`, `VestingCurve`, `Clock`)
//! - [`event`] — observability events appended by state-changing operations
//! - [`ledger`] — thread-safe in-memory `AssetLedger`

pub mod constants;
pub mod error;
pub mod event;
pub mod ledger;
pub mod math;
pub mod traits;
pub mod types;

pub use error::{ArithmeticError, CustodyError, LedgerError, ParseError};
pub use event::CustodyEvent;
pub use ledger::MemoryLedger;
pub use traits::{AssetLedger, Clock, VestingCurve};
pub use types::{Address, Amount, Asset, Shares, Timestamp};
