//! # tranche-split — Share-weighted distribution of an accumulating balance.
//!
//! - [`ShareRegistry`]: admin-managed payee → share weight map with a stable
//!   iteration order and an always-consistent share total.
//! - [`Distributor`]: settles the whole payee set in one all-or-nothing sweep,
//!   paying each payee `⌊total_received * shares / total_shares⌋` minus what
//!   it was already paid.
//!
//! Entitlements are recomputed from current shares against everything ever
//! received. A share change therefore re-splits every unswept unit under
//! the new ratios; only amounts already paid are fixed. Payees who want the
//! current ratio locked in must sweep before the change.

pub mod distributor;
pub mod registry;

pub use distributor::{Distributor, DistributorConfig, Payment};
pub use registry::{PayeeConfig, ShareRegistry};
