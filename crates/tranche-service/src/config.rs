//! Service configuration.
//!
//! [`ServiceConfig`] describes the instances a [`Custodian`](crate::Custodian)
//! hosts and how it logs. It is read from an optional TOML file layered
//! with `TRANCHE_`-prefixed environment variables, where `__` separates
//! nested keys (`TRANCHE_LOG_LEVEL=debug`).

use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tranche_core::error::ArithmeticError;
use tranche_core::types::{Address, Amount, Asset};
use tranche_split::DistributorConfig;
use tranche_vesting::VestingConfig;

use crate::error::ServiceError;
use crate::logging::LogFormat;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "TRANCHE";

/// Largest `decimals` accepted in a funding entry.
pub const MAX_DECIMALS: u32 = 36;

/// An initial balance credited to the ledger before any instance runs.
///
/// TOML integers stop at `i64::MAX`, so large balances are written as a
/// whole-unit `amount` scaled by `10^decimals`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FundingConfig {
    pub holder: Address,
    #[serde(default)]
    pub asset: Asset,
    pub amount: u64,
    #[serde(default)]
    pub decimals: u32,
}

impl FundingConfig {
    /// `amount * 10^decimals` in the asset's smallest unit.
    pub fn scaled_amount(&self) -> Result<Amount, ArithmeticError> {
        let scale = 10u128
            .checked_pow(self.decimals)
            .ok_or(ArithmeticError::Overflow)?;
        (self.amount as Amount)
            .checked_mul(scale)
            .ok_or(ArithmeticError::Overflow)
    }
}

/// Configuration for a custodian instance.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ServiceConfig {
    /// Log level filter string (e.g. "info", "tranche_split=debug").
    pub log_level: String,
    /// "text" or "json".
    pub log_format: String,
    pub vesting: Vec<VestingConfig>,
    pub distributors: Vec<DistributorConfig>,
    pub funding: Vec<FundingConfig>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Text.to_string(),
            vesting: Vec::new(),
            distributors: Vec::new(),
            funding: Vec::new(),
        }
    }
}

impl ServiceConfig {
    /// Load from `path` (if any) and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ServiceError> {
        Self::load_with(path, Self::environment())
    }

    /// Parse a TOML document, ignoring the environment.
    pub fn from_toml_str(toml: &str) -> Result<Self, ServiceError> {
        let settings = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn load_with(path: Option<&Path>, env: Environment) -> Result<Self, ServiceError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }
        let settings = builder.add_source(env).build()?;
        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
    }

    /// Parsed [`log_format`](Self::log_format).
    pub fn format(&self) -> Result<LogFormat, ServiceError> {
        self.log_format.parse()
    }

    /// Check everything that can be checked without building instances.
    pub fn validate(&self) -> Result<(), ServiceError> {
        self.format()?;
        if self.log_level.trim().is_empty() {
            return Err(ServiceError::Config("log_level is empty".into()));
        }
        for (i, v) in self.vesting.iter().enumerate() {
            v.schedule
                .validate()
                .map_err(|e| ServiceError::Config(format!("vesting[{i}]: {e}")))?;
        }
        for (i, f) in self.funding.iter().enumerate() {
            if f.decimals > MAX_DECIMALS {
                return Err(ServiceError::Config(format!(
                    "funding[{i}]: decimals {} exceeds {MAX_DECIMALS}",
                    f.decimals
                )));
            }
            f.scaled_amount()
                .map_err(|e| ServiceError::Config(format!("funding[{i}]: {e}")))?;
        }
        Ok(())
    }
}
