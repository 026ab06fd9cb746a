//! Native-unit conversions

use crate::errors::{PanelError, PanelResult};

/// Decimals of the chain's native unit
pub const ETHER_DECIMALS: u32 = 18;

/// Fixed deposit sent by the deposit window
pub const DEPOSIT_ETHER: &str = "0.1";

/// Convert a decimal ether amount (`"0.1"`, `"2"`, `"1,5"`) to wei.
pub fn ether_to_wei(amount: &str) -> PanelResult<u128> {
    let invalid = || PanelError::InvalidAmount(amount.to_string());

    let normalized = amount.trim().replace(',', ".");
    let (whole, frac) = match normalized.split_once('.') {
        Some((w, f)) => (w, f),
        None => (normalized.as_str(), ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    if frac.len() > ETHER_DECIMALS as usize {
        return Err(invalid());
    }

    let unit = 10u128.pow(ETHER_DECIMALS);
    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };
    let frac_wei: u128 = if frac.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", frac, width = ETHER_DECIMALS as usize);
        padded.parse().map_err(|_| invalid())?
    };

    whole
        .checked_mul(unit)
        .and_then(|w| w.checked_add(frac_wei))
        .ok_or_else(invalid)
}
