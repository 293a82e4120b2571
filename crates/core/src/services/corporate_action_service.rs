use chrono::NaiveDate;

use crate::errors::CoreError;
use crate::models::corporate_action::{CorporateActionKind, CorporateActionResult, Ratio};
use crate::models::decimal::out_of_range;
use crate::models::ledger::Ledger;
use crate::models::trade::{normalize_ticker, Trade};

/// Applies splits and reverse splits retroactively to a ticker's history.
///
/// Stateless: nothing about the action itself is stored. Trades dated strictly
/// before the effective date are rewritten; trades on or after it already
/// reflect the new share count and are left alone.
pub struct CorporateActionService;

impl CorporateActionService {
    pub fn new() -> Self {
        Self
    }

    /// Reverse split `N:1`: quantity ÷ N, price × N.
    pub fn apply_reverse_split(
        &self,
        ledger: &mut Ledger,
        ticker: &str,
        ratio: Ratio,
        effective_date: NaiveDate,
    ) -> Result<CorporateActionResult, CoreError> {
        self.apply(ledger, ticker, CorporateActionKind::ReverseSplit, ratio, effective_date)
    }

    /// Split `1:N`: quantity × N, price ÷ N.
    pub fn apply_split(
        &self,
        ledger: &mut Ledger,
        ticker: &str,
        ratio: Ratio,
        effective_date: NaiveDate,
    ) -> Result<CorporateActionResult, CoreError> {
        self.apply(ledger, ticker, CorporateActionKind::Split, ratio, effective_date)
    }

    /// Shared path for both kinds. All adjusted trades are computed first and
    /// swapped in by id on a staged copy; a failure (including an adjusted
    /// value out of `Decimal` range) leaves the ledger untouched.
    pub fn apply(
        &self,
        ledger: &mut Ledger,
        ticker: &str,
        kind: CorporateActionKind,
        ratio: Ratio,
        effective_date: NaiveDate,
    ) -> Result<CorporateActionResult, CoreError> {
        let ticker = normalize_ticker(ticker);
        let before = ledger
            .position(&ticker)
            .ok_or_else(|| CoreError::NotFound(format!("position {ticker}")))?
            .metrics();
        let factor = kind.factor(ratio)?;

        let adjusted = ledger
            .trades_for(&ticker)
            .into_iter()
            .filter(|t| t.date() < effective_date)
            .map(|t| {
                let overflow = || out_of_range(t.ticker());
                match kind {
                    CorporateActionKind::ReverseSplit => t.adjusted(
                        t.quantity().checked_div(factor).ok_or_else(overflow)?,
                        t.price().checked_mul(factor).ok_or_else(overflow)?,
                    ),
                    CorporateActionKind::Split => t.adjusted(
                        t.quantity().checked_mul(factor).ok_or_else(overflow)?,
                        t.price().checked_div(factor).ok_or_else(overflow)?,
                    ),
                }
            })
            .collect::<Result<Vec<Trade>, CoreError>>()?;
        let trades_adjusted = adjusted.len();

        let mut staged = ledger.clone();
        staged.replace_trades(adjusted)?;
        staged.recompute()?;
        *ledger = staged;

        let after = ledger
            .position(&ticker)
            .map(|p| p.metrics())
            .unwrap_or_default();

        log::info!(
            "{kind} {ratio} on {ticker} effective {effective_date}: {trades_adjusted} trades adjusted, \
             quantity {} -> {}",
            before.held_quantity,
            after.held_quantity
        );

        Ok(CorporateActionResult {
            ticker,
            kind,
            ratio,
            effective_date,
            trades_adjusted,
            quantity_before: before.held_quantity,
            quantity_after: after.held_quantity,
            average_cost_before: before.average_cost,
            average_cost_after: after.average_cost,
        })
    }
}

impl Default for CorporateActionService {
    fn default() -> Self {
        Self::new()
    }
}
