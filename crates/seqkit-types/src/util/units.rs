//! Rendering of on-chain integer amounts in human units.
//!
//! Balances arrive from the indexer as integers in the token's smallest unit.
//! The fee-option picker shows them in whole-token units, which requires the
//! token decimals (18 when the token does not report any).

use alloy_primitives::U256;

/// Decimals assumed for tokens that do not report them, and for native tokens.
pub const DEFAULT_DECIMALS: u8 = 18;

/// Formats `value` (in smallest units) as a decimal string with `decimals` places,
/// trimming trailing zeros.
///
/// ```
/// use alloy_primitives::U256;
/// use seqkit_types::util::format_units;
///
/// assert_eq!(format_units(U256::from(1_500_000u64), 6), "1.5");
/// assert_eq!(format_units(U256::from(42u64), 0), "42");
/// assert_eq!(format_units(U256::from(1u64), 18), "0.000000000000000001");
/// ```
pub fn format_units(value: U256, decimals: u8) -> String {
    if decimals == 0 {
        return value.to_string();
    }
    let Some(unit) = U256::from(10u8).checked_pow(U256::from(decimals)) else {
        return value.to_string();
    };
    let (whole, fraction) = value.div_rem(unit);
    if fraction.is_zero() {
        return whole.to_string();
    }
    let fraction = format!("{:0>width$}", fraction.to_string(), width = decimals as usize);
    format!("{}.{}", whole, fraction.trim_end_matches('0'))
}

/// Like [`format_units`], falling back to [`DEFAULT_DECIMALS`].
pub fn format_units_or_default(value: U256, decimals: Option<u8>) -> String {
    format_units(value, decimals.unwrap_or(DEFAULT_DECIMALS))
}
