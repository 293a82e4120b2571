use rust_decimal::Decimal;

use crate::errors::CoreError;
use crate::models::distribution::Distribution;
use crate::models::ledger::Ledger;
use crate::models::outcome::BatchOutcome;
use crate::models::trade::{normalize_ticker, Trade, TradeId};

/// Validates incoming trades and distributions and books them into the ledger.
///
/// Pure business logic, no I/O. Every successful mutation ends with a full
/// recompute; every failed one leaves the ledger exactly as it was.
pub struct IngestService;

impl IngestService {
    pub fn new() -> Self {
        Self
    }

    /// Validate a trade before it touches the ledger.
    ///
    /// Rules:
    /// - Ticker must be non-empty
    /// - Quantity, price and amount must be positive
    pub fn validate_trade(&self, trade: &Trade) -> Result<(), CoreError> {
        if trade.ticker().is_empty() {
            return Err(CoreError::Validation("Ticker is required".into()));
        }
        Self::require_positive(trade.quantity(), "quantity", trade.ticker())?;
        Self::require_positive(trade.price(), "price", trade.ticker())?;
        Self::require_positive(trade.amount(), "amount", trade.ticker())?;
        Ok(())
    }

    /// Validate a distribution before it touches the ledger.
    ///
    /// The category is already constrained by [`DistributionCategory`]; the
    /// remaining rules are a non-empty ticker and positive numbers.
    ///
    /// [`DistributionCategory`]: crate::models::distribution::DistributionCategory
    pub fn validate_distribution(&self, distribution: &Distribution) -> Result<(), CoreError> {
        if distribution.ticker().is_empty() {
            return Err(CoreError::Validation("Ticker is required".into()));
        }
        Self::require_positive(distribution.quantity(), "quantity", distribution.ticker())?;
        Self::require_positive(distribution.unit_value(), "unit value", distribution.ticker())?;
        Self::require_positive(distribution.total_value(), "total value", distribution.ticker())?;
        Ok(())
    }

    /// Add a single trade. Fails with `Duplicate` if its fingerprint is known.
    pub fn ingest_trade(&self, ledger: &mut Ledger, trade: Trade) -> Result<TradeId, CoreError> {
        self.validate_trade(&trade)?;
        let mut staged = ledger.clone();
        let id = staged.insert_trade(trade)?;
        staged.recompute()?;
        *ledger = staged;
        Ok(id)
    }

    /// Add a batch of trades.
    ///
    /// Duplicates (against the ledger or earlier in the same batch) are
    /// skipped and counted. Any validation failure aborts the whole batch and
    /// nothing is committed.
    pub fn ingest_trades(&self, ledger: &mut Ledger, trades: Vec<Trade>) -> Result<BatchOutcome, CoreError> {
        // Phase 1: apply to a staged copy
        let mut staged = ledger.clone();
        let mut outcome = BatchOutcome::default();

        for trade in trades {
            self.validate_trade(&trade)?;
            match staged.insert_trade(trade) {
                Ok(_) => outcome.added += 1,
                Err(e) if e.is_duplicate() => outcome.duplicates += 1,
                Err(e) => return Err(e),
            }
        }

        // Phase 2: all valid, commit
        if outcome.added > 0 {
            staged.recompute()?;
            *ledger = staged;
        }
        log::info!(
            "Imported trades: {} added, {} duplicates skipped",
            outcome.added,
            outcome.duplicates
        );
        Ok(outcome)
    }

    /// Add a single distribution. Fails with `Duplicate` if its fingerprint is known.
    pub fn ingest_distribution(&self, ledger: &mut Ledger, distribution: Distribution) -> Result<(), CoreError> {
        self.validate_distribution(&distribution)?;
        let mut staged = ledger.clone();
        staged.insert_distribution(distribution)?;
        staged.recompute()?;
        *ledger = staged;
        Ok(())
    }

    /// Add a batch of distributions with the same all-or-nothing contract as
    /// [`ingest_trades`](Self::ingest_trades).
    pub fn ingest_distributions(
        &self,
        ledger: &mut Ledger,
        distributions: Vec<Distribution>,
    ) -> Result<BatchOutcome, CoreError> {
        let mut staged = ledger.clone();
        let mut outcome = BatchOutcome::default();

        for distribution in distributions {
            self.validate_distribution(&distribution)?;
            match staged.insert_distribution(distribution) {
                Ok(()) => outcome.added += 1,
                Err(e) if e.is_duplicate() => outcome.duplicates += 1,
                Err(e) => return Err(e),
            }
        }

        if outcome.added > 0 {
            staged.recompute()?;
            *ledger = staged;
        }
        log::info!(
            "Imported distributions: {} added, {} duplicates skipped",
            outcome.added,
            outcome.duplicates
        );
        Ok(outcome)
    }

    /// Pre-flight check before building a sell: the position must exist and
    /// hold at least `quantity` units.
    pub fn can_sell(&self, ledger: &Ledger, ticker: &str, quantity: Decimal) -> Result<(), CoreError> {
        let ticker = normalize_ticker(ticker);
        let position = ledger
            .position(&ticker)
            .ok_or_else(|| CoreError::NotFound(format!("position {ticker}")))?;

        if Decimal::from(position.held_quantity()) < quantity {
            return Err(CoreError::InsufficientQuantity {
                ticker,
                held: position.held_quantity(),
                requested: quantity.normalize().to_string(),
            });
        }
        Ok(())
    }

    fn require_positive(value: Decimal, field: &str, ticker: &str) -> Result<(), CoreError> {
        if value <= Decimal::ZERO {
            return Err(CoreError::Validation(format!(
                "{ticker}: {field} must be greater than zero (got {value})"
            )));
        }
        Ok(())
    }
}

impl Default for IngestService {
    fn default() -> Self {
        Self::new()
    }
}
