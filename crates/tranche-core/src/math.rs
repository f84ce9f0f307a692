//! Exact integer helpers shared by the vesting curves and the distributor.
//!
//! Every division truncates toward zero and no rounding adjustment is ever
//! applied. Settlement relies on truncation: the sum of truncated
//! entitlements never exceeds the amount being split, so the engine can
//! never pay out more than it received.

use crate::constants::MAX_HALVINGS;
use crate::error::ArithmeticError;
use crate::types::Amount;

/// Compute `⌊a * b / c⌋` exactly.
///
/// Splits `a = q * c + r` and returns `q * b + ⌊r * b / c⌋`. Because `r < c`,
/// the second product never overflows when `b <= c` and `c` fits in 64 bits,
/// which covers `shares / total_shares` and `elapsed / duration`. The result
/// is identical to the naive formula whenever the naive formula fits.
pub fn mul_div(a: Amount, b: Amount, c: Amount) -> Result<Amount, ArithmeticError> {
    if c == 0 {
        return Err(ArithmeticError::DivisionByZero);
    }
    let q = a / c;
    let r = a % c;
    let whole = q.checked_mul(b).ok_or(ArithmeticError::Overflow)?;
    let frac = r.checked_mul(b).ok_or(ArithmeticError::Overflow)? / c;
    whole.checked_add(frac).ok_or(ArithmeticError::Overflow)
}

/// `value >> halvings`, defined as 0 once every bit has shifted out.
pub fn halve_n(value: Amount, halvings: u64) -> Amount {
    if halvings >= MAX_HALVINGS {
        return 0;
    }
    value >> halvings
}

/// Checked addition mapped onto [`ArithmeticError`].
pub fn add(a: Amount, b: Amount) -> Result<Amount, ArithmeticError> {
    a.checked_add(b).ok_or(ArithmeticError::Overflow)
}
