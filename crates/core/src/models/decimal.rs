use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::errors::CoreError;

/// Number of decimal places the ledger keeps for quantities and money.
pub const LEDGER_SCALE: u32 = 4;

/// Round half away from zero to `scale` places.
pub fn round_to(value: Decimal, scale: u32) -> Decimal {
    value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero)
}

/// Round to the ledger's 4-place precision.
pub fn round4(value: Decimal) -> Decimal {
    round_to(value, LEDGER_SCALE)
}

/// Round to the nearest whole unit. Saturates on overflow.
pub fn round_to_units(value: Decimal) -> i64 {
    let rounded = round_to(value, 0);
    rounded.to_i64().unwrap_or(if rounded.is_sign_negative() {
        i64::MIN
    } else {
        i64::MAX
    })
}

/// Validation error for arithmetic that leaves the `Decimal` range.
pub fn out_of_range(context: &str) -> CoreError {
    CoreError::Validation(format!("{context}: value is out of range"))
}

/// Render with exactly `scale` places, e.g. `fixed(2.8, 4) == "2.8000"`.
pub fn fixed(value: Decimal, scale: u32) -> String {
    let mut scaled = round_to(value, scale);
    scaled.rescale(scale);
    scaled.to_string()
}

/// Render with the ledger's fixed 4-place precision.
pub fn fixed4(value: Decimal) -> String {
    fixed(value, LEDGER_SCALE)
}

/// Parse a persisted fixed-point string. `field` names the value in the error.
pub fn parse_fixed(raw: &str, field: &str) -> Result<Decimal, CoreError> {
    raw.trim()
        .parse::<Decimal>()
        .map_err(|e| CoreError::Deserialization(format!("Invalid {field} '{raw}': {e}")))
}
