pub mod errors;
pub mod fingerprint;
pub mod models;
pub mod services;
pub mod storage;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use errors::CoreError;
use models::{
    corporate_action::{CorporateActionResult, Ratio},
    distribution::{Distribution, DistributionCategory},
    ledger::Ledger,
    outcome::{BatchOutcome, ConversionResult, MergeResult},
    position::{Classification, Position},
    trade::{Trade, TradeId},
};
use services::{
    corporate_action_service::CorporateActionService,
    ingest_service::IngestService,
    reclassification_service::ReclassificationService,
    report_service::{ClassificationGroup, ReportService},
};

/// Main entry point for the ledger core library.
/// Holds the ledger and all services needed to operate on it.
///
/// Persistence lives in [`storage::vault`]: an
/// [`UnlockedVault`](storage::vault::UnlockedVault) owns a `Wallet` and
/// writes it back encrypted.
#[must_use]
pub struct Wallet {
    ledger: Ledger,
    ingest_service: IngestService,
    corporate_action_service: CorporateActionService,
    reclassification_service: ReclassificationService,
    report_service: ReportService,
    /// Tracks whether any mutation has occurred since the last save/load.
    dirty: bool,
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("trades", &self.ledger.trade_count())
            .field("positions", &self.ledger.positions().count())
            .field("distributions", &self.ledger.distribution_count())
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl Default for Wallet {
    fn default() -> Self {
        Self::new()
    }
}

impl Wallet {
    /// Create an empty wallet.
    pub fn new() -> Self {
        Self::from_ledger(Ledger::new())
    }

    /// Wrap a ledger loaded from storage. Starts clean.
    pub fn from_ledger(ledger: Ledger) -> Self {
        Self {
            ledger,
            ingest_service: IngestService::new(),
            corporate_action_service: CorporateActionService::new(),
            reclassification_service: ReclassificationService::new(),
            report_service: ReportService::new(),
            dirty: false,
        }
    }

    #[must_use]
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Returns `true` if the wallet has been modified since the last save or load.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_saved(&mut self) {
        self.dirty = false;
    }

    // ── Ingestion ───────────────────────────────────────────────────

    /// Add a single trade.
    pub fn add_trade(&mut self, trade: Trade) -> Result<TradeId, CoreError> {
        let id = self.ingest_service.ingest_trade(&mut self.ledger, trade)?;
        self.dirty = true;
        Ok(id)
    }

    /// Import a batch of trades; duplicates are skipped and counted.
    pub fn add_trades(&mut self, trades: Vec<Trade>) -> Result<BatchOutcome, CoreError> {
        let outcome = self.ingest_service.ingest_trades(&mut self.ledger, trades)?;
        if outcome.added > 0 {
            self.dirty = true;
        }
        Ok(outcome)
    }

    pub fn add_distribution(&mut self, distribution: Distribution) -> Result<(), CoreError> {
        self.ingest_service
            .ingest_distribution(&mut self.ledger, distribution)?;
        self.dirty = true;
        Ok(())
    }

    pub fn add_distributions(&mut self, distributions: Vec<Distribution>) -> Result<BatchOutcome, CoreError> {
        let outcome = self
            .ingest_service
            .ingest_distributions(&mut self.ledger, distributions)?;
        if outcome.added > 0 {
            self.dirty = true;
        }
        Ok(outcome)
    }

    /// Check that `quantity` units of `ticker` are held before building a sell.
    pub fn can_sell(&self, ticker: &str, quantity: Decimal) -> Result<(), CoreError> {
        self.ingest_service.can_sell(&self.ledger, ticker, quantity)
    }

    // ── Corporate actions ───────────────────────────────────────────

    pub fn apply_reverse_split(
        &mut self,
        ticker: &str,
        ratio: Ratio,
        effective_date: NaiveDate,
    ) -> Result<CorporateActionResult, CoreError> {
        let result = self.corporate_action_service.apply_reverse_split(
            &mut self.ledger,
            ticker,
            ratio,
            effective_date,
        )?;
        self.dirty = true;
        Ok(result)
    }

    pub fn apply_split(
        &mut self,
        ticker: &str,
        ratio: Ratio,
        effective_date: NaiveDate,
    ) -> Result<CorporateActionResult, CoreError> {
        let result = self
            .corporate_action_service
            .apply_split(&mut self.ledger, ticker, ratio, effective_date)?;
        self.dirty = true;
        Ok(result)
    }

    // ── Reclassification ────────────────────────────────────────────

    /// Fold a fractional ticker (e.g. `ITSA4F`) into its existing parent.
    pub fn merge_fractional(&mut self, fractional_ticker: &str) -> Result<MergeResult, CoreError> {
        let result = self
            .reclassification_service
            .merge_fractional(&mut self.ledger, fractional_ticker)?;
        self.dirty = true;
        Ok(result)
    }

    /// Same as [`merge_fractional`](Self::merge_fractional) but creates the
    /// parent position if it is missing.
    pub fn create_and_merge_fractional(&mut self, fractional_ticker: &str) -> Result<MergeResult, CoreError> {
        let result = self
            .reclassification_service
            .create_and_merge_fractional(&mut self.ledger, fractional_ticker)?;
        self.dirty = true;
        Ok(result)
    }

    pub fn convert_subscription(
        &mut self,
        subscription_ticker: &str,
        parent_ticker: &str,
    ) -> Result<ConversionResult, CoreError> {
        let result = self.reclassification_service.convert_subscription(
            &mut self.ledger,
            subscription_ticker,
            parent_ticker,
        )?;
        self.dirty = true;
        Ok(result)
    }

    pub fn set_classification(&mut self, ticker: &str, classification: Classification) -> Result<(), CoreError> {
        self.reclassification_service
            .set_classification(&mut self.ledger, ticker, classification)?;
        self.dirty = true;
        Ok(())
    }

    pub fn link_subscription(&mut self, ticker: &str, parent: &str) -> Result<(), CoreError> {
        self.reclassification_service
            .link_subscription(&mut self.ledger, ticker, parent)?;
        self.dirty = true;
        Ok(())
    }

    // ── Queries ─────────────────────────────────────────────────────

    #[must_use]
    pub fn position(&self, ticker: &str) -> Option<&Position> {
        self.ledger.position(ticker)
    }

    /// Trades booked under `ticker`, in ingestion order.
    #[must_use]
    pub fn trades_for(&self, ticker: &str) -> Vec<&Trade> {
        self.ledger.trades_for(ticker)
    }

    #[must_use]
    pub fn active_positions(&self) -> Vec<&Position> {
        self.report_service.active_positions(&self.ledger)
    }

    #[must_use]
    pub fn closed_positions(&self) -> Vec<&Position> {
        self.report_service.closed_positions(&self.ledger)
    }

    #[must_use]
    pub fn group_by_classification(&self, active_only: bool) -> BTreeMap<ClassificationGroup, Vec<&Position>> {
        self.report_service
            .group_by_classification(&self.ledger, active_only)
    }

    #[must_use]
    pub fn income_by_category(&self) -> BTreeMap<DistributionCategory, Decimal> {
        self.report_service.income_by_category(&self.ledger)
    }

    #[must_use]
    pub fn income_by_year(&self) -> BTreeMap<i32, Decimal> {
        self.report_service.income_by_year(&self.ledger)
    }
}
