//! Vesting curves implementing the [`VestingCurve`] trait.
//!
//! Both curves map `(allocation, elapsed)` to the cumulative vested amount
//! with integer arithmetic only. Division truncates toward zero and no
//! rounding adjustment is applied; the truncation is what keeps every curve
//! at or below its allocation.

use serde::{Deserialize, Serialize};
use tranche_core::error::{ArithmeticError, CustodyError};
use tranche_core::math::{halve_n, mul_div};
use tranche_core::traits::VestingCurve;
use tranche_core::types::Amount;

/// Even unlock over `duration` seconds.
///
/// `vested = ⌊allocation * elapsed / duration⌋`, 0 at `elapsed = 0`, the whole
/// allocation once `elapsed >= duration`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Linear {
    /// Seconds from start until everything is vested.
    pub duration: u64,
}

impl Linear {
    pub fn new(duration: u64) -> Self {
        Self { duration }
    }
}

impl VestingCurve for Linear {
    fn vested_amount(&self, allocation: Amount, elapsed: u64) -> Result<Amount, ArithmeticError> {
        if elapsed == 0 {
            return Ok(0);
        }
        if elapsed >= self.duration {
            return Ok(allocation);
        }
        mul_div(allocation, elapsed as Amount, self.duration as Amount)
    }

    fn full_vest_after(&self) -> Option<u64> {
        Some(self.duration)
    }
}

/// Halving-decay unlock.
///
/// Over each half-life window, half of what was still locked at the start of
/// the window unlocks, linearly within the window. With `k = ⌊e / H⌋`
/// completed half-lives, `r = e mod H`, and `p = V >> k` still locked:
///
/// `vested = (V - p) + ⌊p * r / (2H)⌋`
///
/// The curve approaches `V` as `p` shifts down to zero. When `max_duration`
/// is set, everything is vested once `elapsed >= max_duration`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct HalvingDecay {
    /// Seconds per halving window. Must be non-zero.
    pub half_life: u64,
    /// Elapsed seconds after which the whole allocation is vested.
    #[serde(default)]
    pub max_duration: Option<u64>,
}

impl HalvingDecay {
    /// Uncapped curve with the given half-life.
    pub fn new(half_life: u64) -> Result<Self, CustodyError> {
        let curve = Self {
            half_life,
            max_duration: None,
        };
        curve.validate()?;
        Ok(curve)
    }

    /// Curve that fully vests at `max_duration`.
    pub fn with_max_duration(half_life: u64, max_duration: u64) -> Result<Self, CustodyError> {
        let curve = Self {
            half_life,
            max_duration: Some(max_duration),
        };
        curve.validate()?;
        Ok(curve)
    }

    pub fn validate(&self) -> Result<(), CustodyError> {
        if self.half_life == 0 {
            return Err(CustodyError::invalid("half_life must be non-zero"));
        }
        if self.max_duration == Some(0) {
            return Err(CustodyError::invalid("max_duration must be non-zero"));
        }
        Ok(())
    }

    /// Number of completed half-lives after `elapsed` seconds.
    pub fn halvings(&self, elapsed: u64) -> u64 {
        elapsed.checked_div(self.half_life).unwrap_or(0)
    }
}

impl VestingCurve for HalvingDecay {
    fn vested_amount(&self, allocation: Amount, elapsed: u64) -> Result<Amount, ArithmeticError> {
        if let Some(cutoff) = self.max_duration {
            if elapsed >= cutoff {
                return Ok(allocation);
            }
        }
        if self.half_life == 0 {
            return Err(ArithmeticError::DivisionByZero);
        }

        let k = elapsed / self.half_life;
        let r = elapsed % self.half_life;
        let locked = halve_n(allocation, k);

        // Half of `locked` unlocks across the current window.
        let window = (self.half_life as Amount) * 2;
        let unlocking = mul_div(locked, r as Amount, window)?;

        Ok(allocation - locked + unlocking)
    }

    fn full_vest_after(&self) -> Option<u64> {
        self.max_duration
    }
}

/// A configured vesting schedule.
///
/// Deserialises from `{ kind = "linear", duration = .. }` or
/// `{ kind = "halving_decay", half_life = .., max_duration = .. }`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Schedule {
    Linear(Linear),
    HalvingDecay(HalvingDecay),
}

impl Schedule {
    pub fn linear(duration: u64) -> Self {
        Self::Linear(Linear::new(duration))
    }

    pub fn halving(half_life: u64, max_duration: Option<u64>) -> Self {
        Self::HalvingDecay(HalvingDecay {
            half_life,
            max_duration,
        })
    }

    /// Reject parameters the curve cannot evaluate.
    pub fn validate(&self) -> Result<(), CustodyError> {
        match self {
            Self::Linear(_) => Ok(()),
            Self::HalvingDecay(h) => h.validate(),
        }
    }

    fn curve(&self) -> &dyn VestingCurve {
        match self {
            Self::Linear(l) => l,
            Self::HalvingDecay(h) => h,
        }
    }
}

impl VestingCurve for Schedule {
    fn vested_amount(&self, allocation: Amount, elapsed: u64) -> Result<Amount, ArithmeticError> {
        self.curve().vested_amount(allocation, elapsed)
    }

    fn full_vest_after(&self) -> Option<u64> {
        self.curve().full_vest_after()
    }
}
