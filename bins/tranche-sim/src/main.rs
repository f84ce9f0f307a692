//! tranche-sim — step a custodian through simulated time.
//!
//! Loads a service configuration (or the built-in staggered-ratchet
//! scenario), seeds an in-memory ledger from its funding entries, and on
//! every step releases each vesting account and sweeps each distributor.
//! One CSV row per step and asset goes to stdout; logs go to stderr.

mod scenario;

use std::collections::BTreeSet;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tranche_core::constants::SECONDS_PER_WEEK;
use tranche_core::error::CustodyError;
use tranche_core::ledger::MemoryLedger;
use tranche_core::traits::{AssetLedger, Clock};
use tranche_core::types::{Address, Amount, Asset, Timestamp};
use tranche_service::{init_logging, Custodian, ManualClock, ServiceConfig, ServiceError};

#[derive(Parser, Debug)]
#[command(
    name = "tranche-sim",
    version,
    about = "Simulate vesting accounts feeding distributors over time"
)]
struct Args {
    /// TOML configuration file. Without one the built-in scenario runs.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of steps to simulate.
    #[arg(long, default_value_t = 9 * 365 / 7)]
    steps: u64,

    /// Seconds per step.
    #[arg(long, default_value_t = SECONDS_PER_WEEK)]
    step_secs: u64,

    /// Clock reading before the first step. Defaults to the earliest
    /// vesting start.
    #[arg(long)]
    start: Option<Timestamp>,

    /// Log level override (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Log output format override ("text" or "json").
    #[arg(long)]
    log_format: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ServiceConfig::load(Some(path.as_path()))
            .with_context(|| format!("loading {}", path.display()))?,
        None => scenario::default_config(),
    };
    if let Some(level) = args.log_level.clone() {
        config.log_level = level;
    }
    if let Some(format) = args.log_format.clone() {
        config.log_format = format;
    }
    config.validate().context("invalid configuration")?;
    init_logging(&config.log_level, config.format()?)?;

    if args.step_secs == 0 {
        bail!("--step-secs must be positive");
    }

    let ledger = Arc::new(MemoryLedger::new());
    for f in &config.funding {
        let amount = f.scaled_amount()?;
        ledger
            .credit(&f.holder, &f.asset, amount)
            .map_err(ServiceError::Funding)
            .with_context(|| format!("funding {}", f.holder))?;
    }

    let start = args.start.unwrap_or_else(|| {
        config
            .vesting
            .iter()
            .map(|v| v.start)
            .min()
            .unwrap_or(scenario::GENESIS)
    });
    let clock = Arc::new(ManualClock::new(start));
    let custodian = Custodian::from_config(&config, Arc::clone(&ledger), clock.clone())
        .context("building custodian")?;

    let assets: BTreeSet<Asset> = if config.funding.is_empty() {
        BTreeSet::from([Asset::Native])
    } else {
        config.funding.iter().map(|f| f.asset).collect()
    };
    let payees = payee_columns(&custodian)?;

    info!(
        vesting = config.vesting.len(),
        distributors = config.distributors.len(),
        steps = args.steps,
        step_secs = args.step_secs,
        start,
        "sim: starting"
    );

    let mut out = io::BufWriter::new(io::stdout().lock());
    write_header(&mut out, &custodian, &payees)?;

    for step in 1..=args.steps {
        let now = clock.advance(args.step_secs);
        for asset in &assets {
            let released = release_all(&custodian, asset)?;
            sweep_all(&custodian, asset)?;

            write!(out, "{step},{now},{asset}")?;
            for amount in &released {
                write!(out, ",{amount}")?;
            }
            for payee in &payees {
                write!(out, ",{}", ledger.balance_of(payee, asset))?;
            }
            writeln!(out)?;
        }
    }
    out.flush()?;

    let events = custodian.drain_events();
    info!(now = clock.now(), events = events.len(), "sim: finished");
    Ok(())
}

/// Every registered payee across all distributors, in first-seen order.
fn payee_columns(custodian: &Custodian<MemoryLedger>) -> Result<Vec<Address>> {
    let mut seen = BTreeSet::new();
    let mut columns = Vec::new();
    for d in custodian.distributors() {
        let payees = custodian.with_distributor(&d, |d| d.payees().to_vec())?;
        for p in payees {
            if seen.insert(p) {
                columns.push(p);
            }
        }
    }
    Ok(columns)
}

fn write_header(
    out: &mut impl Write,
    custodian: &Custodian<MemoryLedger>,
    payees: &[Address],
) -> io::Result<()> {
    write!(out, "step,timestamp,asset")?;
    for v in custodian.vesting_accounts() {
        write!(out, ",released:{v}")?;
    }
    for p in payees {
        write!(out, ",balance:{p}")?;
    }
    writeln!(out)
}

/// Release every vesting account, returning the amount each paid.
fn release_all(custodian: &Custodian<MemoryLedger>, asset: &Asset) -> Result<Vec<Amount>> {
    custodian
        .vesting_accounts()
        .iter()
        .map(|v| {
            custodian
                .release_vesting(v, asset)
                .with_context(|| format!("releasing {v}"))
        })
        .collect()
}

/// Sweep every distributor. Empty registries are skipped.
fn sweep_all(custodian: &Custodian<MemoryLedger>, asset: &Asset) -> Result<()> {
    for d in custodian.distributors() {
        match custodian.release_split(&d, asset) {
            Ok(_) => {}
            Err(ServiceError::Custody(CustodyError::NoShares)) => {
                warn!(distributor = %d, "sim: no payees registered");
            }
            Err(e) => return Err(e).with_context(|| format!("sweeping {d}")),
        }
    }
    Ok(())
}
