use std::collections::{BTreeMap, HashMap, HashSet};

use crate::errors::CoreError;

use super::distribution::Distribution;
use super::position::{Classification, Position, PositionMetrics};
use super::trade::{normalize_ticker, Trade, TradeId};

/// The main data container: every trade, every position, and the
/// fingerprint indexes used for duplicate detection.
///
/// The global trade list and the fingerprint → id index are only ever
/// changed together inside the methods below; nothing outside this type can
/// reach either one mutably. A position's trades are the global trades that
/// carry its ticker, so the two views cannot drift apart.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    /// All trades, in ingestion order
    trades: Vec<Trade>,

    /// Trade fingerprint → stable trade id
    index: HashMap<String, TradeId>,

    /// Fingerprints of every distribution across all positions
    distribution_index: HashSet<String>,

    /// Ticker → position, ordered by ticker
    positions: BTreeMap<String, Position>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Read access ─────────────────────────────────────────────────

    /// All trades in ingestion order.
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn trade(&self, id: TradeId) -> Option<&Trade> {
        self.trades.iter().find(|t| t.id() == id)
    }

    /// Trades booked under `ticker`, in ingestion order.
    pub fn trades_for(&self, ticker: &str) -> Vec<&Trade> {
        let ticker = normalize_ticker(ticker);
        self.trades.iter().filter(|t| t.ticker() == ticker).collect()
    }

    pub fn trade_count(&self) -> usize {
        self.trades.len()
    }

    pub fn distribution_count(&self) -> usize {
        self.positions.values().map(|p| p.distributions().len()).sum()
    }

    pub fn contains_fingerprint(&self, fingerprint: &str) -> bool {
        self.index.contains_key(fingerprint)
    }

    pub fn contains_distribution(&self, fingerprint: &str) -> bool {
        self.distribution_index.contains(fingerprint)
    }

    pub fn position(&self, ticker: &str) -> Option<&Position> {
        self.positions.get(&normalize_ticker(ticker))
    }

    /// All positions ordered by ticker, including fully sold ones.
    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty() && self.positions.is_empty()
    }

    // ── Mutation primitives ─────────────────────────────────────────

    /// Append a trade, index it, and make sure its position exists.
    /// Does not recompute.
    pub(crate) fn insert_trade(&mut self, trade: Trade) -> Result<TradeId, CoreError> {
        if self.index.contains_key(trade.fingerprint()) {
            return Err(CoreError::Duplicate(format!(
                "{} {} {} on {} is already recorded",
                trade.side(),
                trade.quantity(),
                trade.ticker(),
                trade.date()
            )));
        }
        let id = trade.id();
        self.ensure_position(trade.ticker(), Classification::default());
        self.index.insert(trade.fingerprint().to_string(), id);
        self.trades.push(trade);
        Ok(id)
    }

    /// Credit a distribution to its position, creating the position if needed.
    /// Does not recompute.
    pub(crate) fn insert_distribution(&mut self, distribution: Distribution) -> Result<(), CoreError> {
        if self.distribution_index.contains(distribution.fingerprint()) {
            return Err(CoreError::Duplicate(format!(
                "{} of {} for {} on {} is already recorded",
                distribution.category(),
                distribution.total_value(),
                distribution.ticker(),
                distribution.date()
            )));
        }
        self.distribution_index
            .insert(distribution.fingerprint().to_string());
        self.ensure_position(distribution.ticker(), Classification::default())
            .push_distribution(distribution);
        Ok(())
    }

    /// Swap in new versions of existing trades, matched by [`TradeId`].
    ///
    /// The replacement list and a rebuilt index are assembled off to the side
    /// and only installed once the index is known to be collision-free, so a
    /// failure leaves the ledger untouched.
    pub(crate) fn replace_trades(&mut self, replacements: Vec<Trade>) -> Result<(), CoreError> {
        let mut by_id: HashMap<TradeId, Trade> =
            replacements.into_iter().map(|t| (t.id(), t)).collect();

        let trades: Vec<Trade> = self
            .trades
            .iter()
            .map(|t| by_id.remove(&t.id()).unwrap_or_else(|| t.clone()))
            .collect();

        if let Some(orphan) = by_id.keys().next() {
            return Err(CoreError::NotFound(format!("trade {orphan}")));
        }

        let index = Self::build_index(&trades)?;
        for trade in &trades {
            self.ensure_position(trade.ticker(), Classification::default());
        }
        self.trades = trades;
        self.index = index;
        Ok(())
    }

    /// Drop trades by id. Does not recompute.
    pub(crate) fn remove_trades(&mut self, ids: &HashSet<TradeId>) {
        self.trades.retain(|t| !ids.contains(&t.id()));
        self.index.retain(|_, id| !ids.contains(id));
    }

    /// Create a position with the given tags unless it already exists.
    pub(crate) fn ensure_position(&mut self, ticker: &str, classification: Classification) -> &mut Position {
        self.positions
            .entry(ticker.to_string())
            .or_insert_with(|| Position::new(ticker, classification))
    }

    pub(crate) fn position_mut(&mut self, ticker: &str) -> Option<&mut Position> {
        self.positions.get_mut(&normalize_ticker(ticker))
    }

    /// Remove a position and unindex its distributions. Its trades must have
    /// been moved or removed beforehand.
    pub(crate) fn remove_position(&mut self, ticker: &str) -> Option<Position> {
        let position = self.positions.remove(&normalize_ticker(ticker))?;
        for d in position.distributions() {
            self.distribution_index.remove(d.fingerprint());
        }
        Some(position)
    }

    // ── Recompute ───────────────────────────────────────────────────

    /// Recompute every position's derived metrics from its records.
    ///
    /// This is the only place metrics are written. It is idempotent. Every
    /// position is computed before any is written, so an overflow leaves the
    /// existing metrics in place.
    pub(crate) fn recompute(&mut self) -> Result<(), CoreError> {
        let mut by_ticker: HashMap<&str, Vec<&Trade>> = HashMap::new();
        for trade in &self.trades {
            by_ticker.entry(trade.ticker()).or_default().push(trade);
        }

        let metrics = self
            .positions
            .iter()
            .map(|(ticker, position)| {
                let trades = by_ticker.get(ticker.as_str()).cloned().unwrap_or_default();
                PositionMetrics::compute(trades, position.distributions()).map(|m| (ticker.clone(), m))
            })
            .collect::<Result<Vec<(String, PositionMetrics)>, CoreError>>()?;

        for (ticker, m) in metrics {
            if let Some(position) = self.positions.get_mut(&ticker) {
                position.set_metrics(m);
            }
        }
        Ok(())
    }

    fn build_index(trades: &[Trade]) -> Result<HashMap<String, TradeId>, CoreError> {
        let mut index = HashMap::with_capacity(trades.len());
        for trade in trades {
            if index
                .insert(trade.fingerprint().to_string(), trade.id())
                .is_some()
            {
                return Err(CoreError::Duplicate(format!(
                    "{} {} {} on {} would collide with an existing trade",
                    trade.side(),
                    trade.quantity(),
                    trade.ticker(),
                    trade.date()
                )));
            }
        }
        Ok(index)
    }
}
