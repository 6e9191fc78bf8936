//! Token amount parsing and display helpers.

use alloy_primitives::{
    utils::{format_units, parse_units, ParseUnits},
    U256,
};

use crate::error::{Error, ErrorCode, Result};

/// Decimals assumed for USDC when the token contract cannot be queried.
pub const DEFAULT_DECIMALS: u8 = 6;

/// Largest decimals value accepted by [`check_amount`].
const MAX_DECIMALS: u8 = 18;

/// Parses a positive decimal amount into base units.
pub fn parse_amount(input: &str, decimals: u8) -> Result<U256> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::new(ErrorCode::InvalidAmount, "amount is empty"));
    }
    let parsed = parse_units(trimmed, decimals)
        .map_err(|err| Error::new(ErrorCode::InvalidAmount, format!("{trimmed}: {err}")))?;
    match parsed {
        ParseUnits::U256(value) if !value.is_zero() => Ok(value),
        _ => Err(Error::new(
            ErrorCode::InvalidAmount,
            format!("{trimmed}: amount must be greater than zero"),
        )),
    }
}

/// Validates an amount string before the token decimals are known.
pub fn check_amount(input: &str) -> Result<()> {
    parse_amount(input, MAX_DECIMALS).map(|_| ())
}

/// Renders base units with at least two fractional digits, trimming the rest.
pub fn format_amount(raw: U256, decimals: u8) -> String {
    let full = format_units(raw, decimals).unwrap_or_else(|_| raw.to_string());
    match full.split_once('.') {
        Some((int, frac)) => {
            let frac = frac.trim_end_matches('0');
            format!("{int}.{frac:0<2}")
        }
        None => format!("{full}.00"),
    }
}
