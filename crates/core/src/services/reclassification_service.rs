use std::collections::HashSet;

use crate::errors::CoreError;
use crate::models::ledger::Ledger;
use crate::models::outcome::{ConversionResult, MergeResult};
use crate::models::position::Classification;
use crate::models::trade::{normalize_ticker, Trade, TradeId};

/// Suffix the exchange appends to tickers traded on the fractional market
/// (e.g., `ITSA4F` is the fractional lot of `ITSA4`).
pub const FRACTIONAL_SUFFIX: char = 'F';

/// `true` if `ticker` carries the fractional-market suffix.
pub fn is_fractional_ticker(ticker: &str) -> bool {
    let ticker = normalize_ticker(ticker);
    ticker.len() > 1 && ticker.ends_with(FRACTIONAL_SUFFIX)
}

/// Strip the fractional-market suffix, if present.
pub fn normalize_fractional_ticker(ticker: &str) -> String {
    let ticker = normalize_ticker(ticker);
    if is_fractional_ticker(&ticker) {
        ticker[..ticker.len() - 1].to_string()
    } else {
        ticker
    }
}

/// Moves records between tickers: fractional lots into their parent and
/// subscription rights into the instrument they subscribe to.
///
/// Each operation runs against a staged copy of the ledger and is committed
/// only once every step has succeeded.
pub struct ReclassificationService;

impl ReclassificationService {
    pub fn new() -> Self {
        Self
    }

    /// Fold a fractional ticker into its existing parent position.
    ///
    /// Fails with `NotFound` when the parent does not exist yet; use
    /// [`create_and_merge_fractional`](Self::create_and_merge_fractional) to
    /// create it explicitly.
    pub fn merge_fractional(&self, ledger: &mut Ledger, fractional_ticker: &str) -> Result<MergeResult, CoreError> {
        let (source, target) = Self::fractional_pair(ledger, fractional_ticker)?;
        if ledger.position(&target).is_none() {
            return Err(CoreError::NotFound(format!(
                "position {target} (create it to merge {source} into a new position)"
            )));
        }
        self.merge_into(ledger, &source, &target, false)
    }

    /// Fold a fractional ticker into its parent, creating the parent with the
    /// fractional position's classification if it does not exist.
    pub fn create_and_merge_fractional(
        &self,
        ledger: &mut Ledger,
        fractional_ticker: &str,
    ) -> Result<MergeResult, CoreError> {
        let (source, target) = Self::fractional_pair(ledger, fractional_ticker)?;
        let created = ledger.position(&target).is_none();
        self.merge_into(ledger, &source, &target, created)
    }

    /// Re-book subscription-right purchases under the parent ticker.
    ///
    /// Buys move to the parent with new fingerprints. Sells of the rights are
    /// discarded since they have no place in the parent's cost basis. The
    /// subscription position is removed afterwards.
    pub fn convert_subscription(
        &self,
        ledger: &mut Ledger,
        subscription_ticker: &str,
        parent_ticker: &str,
    ) -> Result<ConversionResult, CoreError> {
        let subscription = normalize_ticker(subscription_ticker);
        let parent = normalize_ticker(parent_ticker);
        if subscription == parent {
            return Err(CoreError::Validation(format!(
                "{subscription} cannot be a subscription of itself"
            )));
        }
        let source_position = ledger
            .position(&subscription)
            .ok_or_else(|| CoreError::NotFound(format!("position {subscription}")))?;
        let classification = source_position.classification().clone();
        let has_distributions = !source_position.distributions().is_empty();
        let before = ledger.position(&parent).map(|p| p.metrics()).unwrap_or_default();

        let mut staged = ledger.clone();
        let (buys, sells): (Vec<&Trade>, Vec<&Trade>) = ledger
            .trades_for(&subscription)
            .into_iter()
            .partition(|t| t.is_buy());

        let converted: Vec<Trade> = buys.iter().map(|t| t.reticker(&parent)).collect();
        let discarded: HashSet<TradeId> = sells.iter().map(|t| t.id()).collect();
        let purchases_converted = converted.len();
        let sales_discarded = discarded.len();

        if sales_discarded > 0 {
            log::warn!(
                "Discarding {sales_discarded} sale(s) of subscription rights {subscription}; \
                 they are not carried into {parent}"
            );
        }

        if purchases_converted > 0 || has_distributions {
            staged.ensure_position(&parent, classification);
        }
        staged.remove_trades(&discarded);
        staged.replace_trades(converted)?;
        let distributions_moved = Self::move_distributions(&mut staged, &subscription, &parent)?;
        staged.recompute()?;

        let after = staged.position(&parent).map(|p| p.metrics()).unwrap_or_default();
        *ledger = staged;

        log::info!(
            "Converted subscription {subscription} into {parent}: {purchases_converted} purchases, \
             {sales_discarded} sales discarded, quantity {} -> {}",
            before.held_quantity,
            after.held_quantity
        );

        Ok(ConversionResult {
            subscription_ticker: subscription,
            parent_ticker: parent,
            purchases_converted,
            sales_discarded,
            distributions_moved,
            parent_quantity_before: before.held_quantity,
            parent_quantity_after: after.held_quantity,
            parent_average_cost_before: before.average_cost,
            parent_average_cost_after: after.average_cost,
        })
    }

    /// Replace a position's user-defined tags.
    pub fn set_classification(
        &self,
        ledger: &mut Ledger,
        ticker: &str,
        classification: Classification,
    ) -> Result<(), CoreError> {
        let ticker = normalize_ticker(ticker);
        if classification.kind.trim().is_empty() {
            return Err(CoreError::Validation("Classification kind is required".into()));
        }
        ledger
            .position_mut(&ticker)
            .ok_or_else(|| CoreError::NotFound(format!("position {ticker}")))?
            .set_classification(classification);
        log::info!("Updated classification of {ticker}");
        Ok(())
    }

    /// Record that `ticker` holds subscription rights for `parent` without
    /// converting anything.
    pub fn link_subscription(&self, ledger: &mut Ledger, ticker: &str, parent: &str) -> Result<(), CoreError> {
        let ticker = normalize_ticker(ticker);
        let parent = normalize_ticker(parent);
        if parent.is_empty() {
            return Err(CoreError::Validation("Parent ticker is required".into()));
        }
        if ticker == parent {
            return Err(CoreError::Validation(format!(
                "{ticker} cannot be a subscription of itself"
            )));
        }
        ledger
            .position_mut(&ticker)
            .ok_or_else(|| CoreError::NotFound(format!("position {ticker}")))?
            .set_subscription_of(Some(parent.clone()));
        log::info!("Linked {ticker} as subscription of {parent}");
        Ok(())
    }

    // ── Internal ────────────────────────────────────────────────────

    /// Validate the fractional marker and existence of the source; return
    /// `(source, target)` tickers.
    fn fractional_pair(ledger: &Ledger, fractional_ticker: &str) -> Result<(String, String), CoreError> {
        let source = normalize_ticker(fractional_ticker);
        if !is_fractional_ticker(&source) {
            return Err(CoreError::Validation(format!(
                "{source} is not a fractional ticker (no trailing '{FRACTIONAL_SUFFIX}')"
            )));
        }
        if ledger.position(&source).is_none() {
            return Err(CoreError::NotFound(format!("position {source}")));
        }
        let target = normalize_fractional_ticker(&source);
        Ok((source, target))
    }

    fn merge_into(
        &self,
        ledger: &mut Ledger,
        source: &str,
        target: &str,
        create_target: bool,
    ) -> Result<MergeResult, CoreError> {
        let before = ledger.position(target).map(|p| p.metrics()).unwrap_or_default();
        let mut staged = ledger.clone();

        if create_target {
            let classification = ledger
                .position(source)
                .map(|p| p.classification().clone())
                .unwrap_or_default();
            staged.ensure_position(target, classification);
        }

        let moved: Vec<Trade> = ledger
            .trades_for(source)
            .into_iter()
            .map(|t| t.reticker(target))
            .collect();
        let trades_moved = moved.len();

        staged.replace_trades(moved)?;
        let distributions_moved = Self::move_distributions(&mut staged, source, target)?;
        staged.recompute()?;

        let after = staged.position(target).map(|p| p.metrics()).unwrap_or_default();
        *ledger = staged;

        log::info!(
            "Merged {source} into {target}{}: {trades_moved} trades, {distributions_moved} distributions, \
             quantity {} -> {}",
            if create_target { " (created)" } else { "" },
            before.held_quantity,
            after.held_quantity
        );

        Ok(MergeResult {
            source_ticker: source.to_string(),
            target_ticker: target.to_string(),
            trades_moved,
            distributions_moved,
            target_created: create_target,
            target_quantity_before: before.held_quantity,
            target_quantity_after: after.held_quantity,
        })
    }

    /// Remove the `source` position and credit its distributions to `target`.
    /// Returns the number of distributions moved.
    fn move_distributions(staged: &mut Ledger, source: &str, target: &str) -> Result<usize, CoreError> {
        let mut position = staged
            .remove_position(source)
            .ok_or_else(|| CoreError::NotFound(format!("position {source}")))?;
        let distributions = position.take_distributions();
        let count = distributions.len();
        for d in distributions {
            staged.insert_distribution(d.reticker(target))?;
        }
        Ok(count)
    }
}

impl Default for ReclassificationService {
    fn default() -> Self {
        Self::new()
    }
}
