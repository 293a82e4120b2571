use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

use super::decimal::{out_of_range, round4, round_to_units};
use super::distribution::Distribution;
use super::trade::{Trade, TradeSide};

/// Default classification kind given to every newly created position.
pub const DEFAULT_KIND: &str = "variable income";

/// User-defined tags for a position. Never derived from records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Classification {
    /// Broad class (e.g., "variable income")
    pub kind: String,

    /// Finer grouping (e.g., "stocks", "real estate funds")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,

    /// Business segment the issuer operates in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment: Option<String>,
}

impl Default for Classification {
    fn default() -> Self {
        Self {
            kind: DEFAULT_KIND.to_string(),
            sub_type: None,
            segment: None,
        }
    }
}

/// Values derived from a position's trades and distributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PositionMetrics {
    /// Σ(price × quantity) / Σ(quantity) over buys, 4 places
    pub average_cost: Decimal,

    /// Σ(amount) over buys, 4 places
    pub invested_capital: Decimal,

    /// Σ buys − Σ sells, rounded to whole units
    pub held_quantity: i64,

    /// Σ distribution totals, 4 places
    pub total_income: Decimal,
}

impl PositionMetrics {
    /// Pure weighted-average computation. Sells only reduce the held
    /// quantity; they never touch cost basis or invested capital.
    ///
    /// Fails with `Validation` if a running total leaves the `Decimal` range.
    pub fn compute<'a>(
        trades: impl IntoIterator<Item = &'a Trade>,
        distributions: &[Distribution],
    ) -> Result<Self, CoreError> {
        let mut cost = Decimal::ZERO;
        let mut bought = Decimal::ZERO;
        let mut sold = Decimal::ZERO;
        let mut invested = Decimal::ZERO;

        for trade in trades {
            let overflow = || out_of_range(trade.ticker());
            match trade.side() {
                TradeSide::Buy => {
                    let value = trade.price().checked_mul(trade.quantity()).ok_or_else(overflow)?;
                    cost = cost.checked_add(value).ok_or_else(overflow)?;
                    bought = bought.checked_add(trade.quantity()).ok_or_else(overflow)?;
                    invested = invested.checked_add(trade.amount()).ok_or_else(overflow)?;
                }
                TradeSide::Sell => {
                    sold = sold.checked_add(trade.quantity()).ok_or_else(overflow)?;
                }
            }
        }

        let average_cost = if bought.is_zero() {
            Decimal::ZERO
        } else {
            round4(
                cost.checked_div(bought)
                    .ok_or_else(|| out_of_range("average cost"))?,
            )
        };

        let total_income = distributions.iter().try_fold(Decimal::ZERO, |acc, d| {
            acc.checked_add(d.total_value())
                .ok_or_else(|| out_of_range(d.ticker()))
        })?;

        let held = bought
            .checked_sub(sold)
            .ok_or_else(|| out_of_range("held quantity"))?;

        Ok(Self {
            average_cost,
            invested_capital: round4(invested),
            held_quantity: round_to_units(held),
            total_income: round4(total_income),
        })
    }
}

/// Per-ticker aggregate.
///
/// Trades are owned by the ledger's global list and resolved by ticker
/// (see [`Ledger::trades_for`](super::ledger::Ledger::trades_for)); the
/// position owns its distributions, tags and derived metrics. Metrics are
/// written only by the ledger's recompute pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    ticker: String,
    distributions: Vec<Distribution>,
    classification: Classification,
    subscription_of: Option<String>,
    metrics: PositionMetrics,
}

impl Position {
    pub(crate) fn new(ticker: impl Into<String>, classification: Classification) -> Self {
        Self {
            ticker: ticker.into(),
            distributions: Vec::new(),
            classification,
            subscription_of: None,
            metrics: PositionMetrics::default(),
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn distributions(&self) -> &[Distribution] {
        &self.distributions
    }

    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    /// Parent ticker when this position holds subscription rights.
    pub fn subscription_of(&self) -> Option<&str> {
        self.subscription_of.as_deref()
    }

    pub fn metrics(&self) -> PositionMetrics {
        self.metrics
    }

    pub fn average_cost(&self) -> Decimal {
        self.metrics.average_cost
    }

    pub fn invested_capital(&self) -> Decimal {
        self.metrics.invested_capital
    }

    pub fn held_quantity(&self) -> i64 {
        self.metrics.held_quantity
    }

    pub fn total_income(&self) -> Decimal {
        self.metrics.total_income
    }

    /// `true` while shares are still held (non-zero quantity).
    pub fn is_active(&self) -> bool {
        self.metrics.held_quantity != 0
    }

    pub(crate) fn push_distribution(&mut self, distribution: Distribution) {
        self.distributions.push(distribution);
    }

    pub(crate) fn take_distributions(&mut self) -> Vec<Distribution> {
        std::mem::take(&mut self.distributions)
    }

    pub(crate) fn set_classification(&mut self, classification: Classification) {
        self.classification = classification;
    }

    pub(crate) fn set_subscription_of(&mut self, parent: Option<String>) {
        self.subscription_of = parent;
    }

    pub(crate) fn set_metrics(&mut self, metrics: PositionMetrics) {
        self.metrics = metrics;
    }
}
