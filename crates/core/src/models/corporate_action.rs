use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Ratio-based corporate actions that retroactively rewrite trade history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CorporateActionKind {
    /// Reverse split ("grouping"), `N:1`: N old shares become one
    ReverseSplit,
    /// Split, `1:N`: one old share becomes N
    Split,
}

impl std::fmt::Display for CorporateActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CorporateActionKind::ReverseSplit => write!(f, "Reverse split"),
            CorporateActionKind::Split => write!(f, "Split"),
        }
    }
}

impl CorporateActionKind {
    /// Check the ratio shape for this kind and return the adjustment factor:
    /// the divisor for a reverse split, the multiplier for a split.
    pub fn factor(&self, ratio: Ratio) -> Result<Decimal, CoreError> {
        match self {
            CorporateActionKind::ReverseSplit => {
                if ratio.to != 1 {
                    return Err(CoreError::Validation(format!(
                        "Reverse split ratio must be N:1 (got {ratio})"
                    )));
                }
                if ratio.from < 2 {
                    return Err(CoreError::Validation(format!(
                        "Reverse split ratio needs N >= 2 (got {ratio})"
                    )));
                }
                Ok(Decimal::from(ratio.from))
            }
            CorporateActionKind::Split => {
                if ratio.from != 1 {
                    return Err(CoreError::Validation(format!(
                        "Split ratio must be 1:N (got {ratio})"
                    )));
                }
                if ratio.to < 2 {
                    return Err(CoreError::Validation(format!(
                        "Split ratio needs N >= 2 (got {ratio})"
                    )));
                }
                Ok(Decimal::from(ratio.to))
            }
        }
    }
}

/// Old-shares : new-shares ratio, e.g. `10:1` or `1:2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ratio {
    pub from: u32,
    pub to: u32,
}

impl Ratio {
    pub fn new(from: u32, to: u32) -> Self {
        Self { from, to }
    }
}

impl std::fmt::Display for Ratio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.from, self.to)
    }
}

impl std::str::FromStr for Ratio {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            CoreError::Validation(format!(
                "Invalid ratio '{s}': expected 'N:M' (e.g., '10:1' or '1:2')"
            ))
        };
        let (from, to) = s.split_once(':').ok_or_else(invalid)?;
        let from = from.trim().parse::<u32>().map_err(|_| invalid())?;
        let to = to.trim().parse::<u32>().map_err(|_| invalid())?;
        if from == 0 || to == 0 {
            return Err(invalid());
        }
        Ok(Self { from, to })
    }
}

/// Outcome of applying a corporate action to one ticker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorporateActionResult {
    pub ticker: String,
    pub kind: CorporateActionKind,
    pub ratio: Ratio,
    pub effective_date: NaiveDate,

    /// Number of pre-effective-date trades rewritten
    pub trades_adjusted: usize,

    pub quantity_before: i64,
    pub quantity_after: i64,
    pub average_cost_before: Decimal,
    pub average_cost_after: Decimal,
}
