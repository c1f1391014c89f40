//! Value coercions used by the field map.

use std::str::FromStr;

use rust_decimal::Decimal;

/// Pass a text value through unchanged.
#[must_use]
pub fn text(raw: Option<&str>) -> Option<String> {
    raw.map(str::to_string)
}

/// A value that is present but not a finite number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotANumber;

/// Parse a decimal number.
///
/// Returns `Ok(None)` for absent or blank input. Plain and scientific
/// notation are accepted.
///
/// # Errors
///
/// Returns `NotANumber` for anything that is not a finite number.
pub fn number(raw: Option<&str>) -> Result<Option<Decimal>, NotANumber> {
    let Some(trimmed) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map(|d| Some(d.normalize()))
        .map_err(|_| NotANumber)
}

/// Multiply a price by two, returning `None` on overflow.
#[must_use]
pub fn doubled(price: Decimal) -> Option<Decimal> {
    price.checked_mul(Decimal::TWO)
}
