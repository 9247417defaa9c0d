//! Conversion between human-readable token amounts and smallest units.

use crate::error::{FaucetError, FaucetResult};

/// Largest number of decimals whose unit (10^decimals) fits in a `u128`.
pub const MAX_DECIMALS: u8 = 38;

/// Parse a decimal amount such as `"0.5"` into smallest units given the
/// token's `decimals`. Rejects negative numbers, excess precision and
/// values that overflow `u128`.
pub fn parse_units(amount: &str, decimals: u8) -> FaucetResult<u128> {
    let invalid = |reason: &str| FaucetError::InvalidAmount(format!("{:?}: {}", amount, reason));

    if decimals > MAX_DECIMALS {
        return Err(invalid("too many decimals"));
    }

    let trimmed = amount.trim();
    let (whole, fraction) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid("empty"));
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("not a non-negative decimal number"));
    }

    let fraction = fraction.trim_end_matches('0');
    if fraction.len() > decimals as usize {
        return Err(invalid("more precision than the token supports"));
    }

    let unit = 10u128.pow(decimals as u32);
    let whole_value = if whole.is_empty() {
        0
    } else {
        whole.parse::<u128>().map_err(|_| invalid("overflow"))?
    };

    let fraction_value = if fraction.is_empty() {
        0
    } else {
        let scale = 10u128.pow((decimals as usize - fraction.len()) as u32);
        fraction.parse::<u128>().map_err(|_| invalid("overflow"))? * scale
    };

    whole_value
        .checked_mul(unit)
        .and_then(|v| v.checked_add(fraction_value))
        .ok_or_else(|| invalid("overflow"))
}
