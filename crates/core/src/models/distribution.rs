use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::fingerprint;

use super::decimal::round4;
use super::trade::normalize_ticker;

/// Kind of income paid out on a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DistributionCategory {
    /// Fund income ("rendimento")
    Income,
    /// Company dividend
    Dividend,
    /// Interest on equity, taxed differently from dividends
    TaxAdvantagedInterest,
    /// Capital returned on redemption
    Redemption,
}

impl DistributionCategory {
    pub const ALL: [DistributionCategory; 4] = [
        DistributionCategory::Income,
        DistributionCategory::Dividend,
        DistributionCategory::TaxAdvantagedInterest,
        DistributionCategory::Redemption,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DistributionCategory::Income => "Income",
            DistributionCategory::Dividend => "Dividend",
            DistributionCategory::TaxAdvantagedInterest => "TaxAdvantagedInterest",
            DistributionCategory::Redemption => "Redemption",
        }
    }
}

impl std::fmt::Display for DistributionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DistributionCategory {
    type Err = CoreError;

    /// Accepts the English names plus the labels found in broker income
    /// statements ("Rendimento", "Dividendo", "Juros Sobre Capital Próprio",
    /// "JCP", "Resgate").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        let category = match lower.as_str() {
            "income" => Some(DistributionCategory::Income),
            "dividend" => Some(DistributionCategory::Dividend),
            "taxadvantagedinterest" | "jcp" => Some(DistributionCategory::TaxAdvantagedInterest),
            "redemption" => Some(DistributionCategory::Redemption),
            _ if lower.contains("rendimento") => Some(DistributionCategory::Income),
            _ if lower.contains("dividendo") => Some(DistributionCategory::Dividend),
            _ if lower.contains("juros") && lower.contains("capital") => {
                Some(DistributionCategory::TaxAdvantagedInterest)
            }
            _ if lower.contains("resgate") => Some(DistributionCategory::Redemption),
            _ => None,
        };
        category.ok_or_else(|| {
            CoreError::Validation(format!(
                "Distribution category must be one of Income, Dividend, \
                 TaxAdvantagedInterest or Redemption (received '{}')",
                s.trim()
            ))
        })
    }
}

/// An income payment credited to a position.
///
/// Same immutability contract as [`Trade`](super::trade::Trade): fields are
/// private and any change produces a new record with a new fingerprint.
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution {
    date: NaiveDate,
    category: DistributionCategory,
    ticker: String,
    quantity: Decimal,
    unit_value: Decimal,
    total_value: Decimal,
    fingerprint: String,
}

impl Distribution {
    pub fn new(
        date: NaiveDate,
        category: DistributionCategory,
        ticker: impl Into<String>,
        quantity: Decimal,
        unit_value: Decimal,
        total_value: Decimal,
    ) -> Self {
        let mut distribution = Self {
            date,
            category,
            ticker: normalize_ticker(&ticker.into()),
            quantity: round4(quantity),
            unit_value: round4(unit_value),
            total_value: round4(total_value),
            fingerprint: String::new(),
        };
        distribution.fingerprint = fingerprint::of_distribution(&distribution);
        distribution
    }

    /// New record credited to a different ticker.
    pub(crate) fn reticker(&self, ticker: &str) -> Self {
        Self::new(
            self.date,
            self.category,
            ticker,
            self.quantity,
            self.unit_value,
            self.total_value,
        )
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn category(&self) -> DistributionCategory {
        self.category
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    pub fn unit_value(&self) -> Decimal {
        self.unit_value
    }

    pub fn total_value(&self) -> Decimal {
        self.total_value
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}
