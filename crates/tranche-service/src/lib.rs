//! Service layer for the Tranche custody engine.
//!
//! Wires the accounting crates to the outside world: configuration loading,
//! log initialisation, clocks, and the [`Custodian`] that hosts vesting
//! accounts and distributors behind per-instance locks.

pub mod clock;
pub mod config;
pub mod custodian;
pub mod error;
pub mod logging;

pub use clock::{ManualClock, SystemClock};
pub use config::{FundingConfig, ServiceConfig};
pub use custodian::Custodian;
pub use error::ServiceError;
pub use logging::{init_logging, LogFormat};
