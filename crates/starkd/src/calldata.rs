//! Selector and calldata helpers
//!
//! Thin wrappers over `starknet-core` that turn entry point names and
//! user-supplied scalars into field elements, in the shapes the contracts
//! expect.

use crate::error::{Result, StarknetError};
use starknet_core::types::Felt;
use starknet_core::utils::get_selector_from_name;

/// Decimal places of the fungible tokens the ERC-20 client talks to.
pub const TOKEN_DECIMALS: u32 = 18;

/// Returns the selector of an entry point name.
pub fn selector(name: &str) -> Result<Felt> {
    get_selector_from_name(name)
        .map_err(|_| StarknetError::InvalidEntryPoint(name.to_string()))
}

/// Parses a wire scalar: `0x`-prefixed hex or plain decimal.
///
/// Values at or above the field prime are rejected rather than reduced.
pub fn parse_felt(value: &str) -> Result<Felt> {
    let trimmed = value.trim();

    if let Some(digits) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StarknetError::invalid_felt(value, "expected hex digits"));
        }
        let felt = Felt::from_hex(&format!("0x{digits}"))
            .map_err(|e| StarknetError::invalid_felt(value, e))?;
        let canonical = format!("0x{}", significant(&digits.to_ascii_lowercase()));
        return in_field(value, felt, felt.to_hex_string() == canonical);
    }

    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(StarknetError::invalid_felt(value, "expected decimal digits"));
    }
    let felt = Felt::from_dec_str(trimmed).map_err(|e| StarknetError::invalid_felt(value, e))?;
    in_field(value, felt, felt.to_string() == significant(trimmed))
}

fn significant(digits: &str) -> &str {
    match digits.trim_start_matches('0') {
        "" => "0",
        rest => rest,
    }
}

// Parsing reduces modulo the prime; a value that does not print back unchanged
// was out of range.
fn in_field(value: &str, felt: Felt, unchanged: bool) -> Result<Felt> {
    if unchanged {
        Ok(felt)
    } else {
        Err(StarknetError::invalid_felt(value, "not below the field prime"))
    }
}

/// Encodes a felt the way JSON-RPC expects it.
pub fn to_hex(value: &Felt) -> String {
    value.to_hex_string()
}

/// Flattens named parameters into calldata, keeping their order.
pub fn compile_calldata(named: &[(&str, &str)]) -> Result<Vec<Felt>> {
    named.iter().map(|(_, value)| parse_felt(value)).collect()
}

/// Scales a decimal token amount such as `"1.5"` to base units.
///
/// The conversion is exact: more fractional digits than `decimals` is an
/// error, as is a result that does not fit in `u128`.
pub fn scale_amount(amount: &str, decimals: u32) -> Result<u128> {
    let trimmed = amount.trim();
    let (whole, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));

    let digits_only = |part: &str| part.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !digits_only(whole) || !digits_only(fraction) {
        return Err(StarknetError::InvalidAmount(format!("'{amount}' is not a decimal amount")));
    }
    if fraction.len() > decimals as usize {
        return Err(StarknetError::InvalidAmount(format!(
            "'{amount}' has more than {decimals} decimal places"
        )));
    }

    let overflow = || StarknetError::AmountOverflow(format!("{trimmed} x 10^{decimals}"));
    let unit = 10u128.checked_pow(decimals).ok_or_else(overflow)?;
    let whole_units = match whole {
        "" => 0,
        digits => digits.parse::<u128>().map_err(|_| overflow())?,
    };
    let fraction_units = match fraction {
        "" => 0,
        digits => {
            let pad = 10u128.pow(decimals - digits.len() as u32);
            digits.parse::<u128>().map_err(|_| overflow())? * pad
        }
    };

    whole_units
        .checked_mul(unit)
        .and_then(|scaled| scaled.checked_add(fraction_units))
        .ok_or_else(overflow)
}

/// Splits a value into the `(low, high)` limbs of a Cairo `Uint256`.
pub fn uint256_calldata(value: u128) -> [Felt; 2] {
    [Felt::from(value), Felt::ZERO]
}
