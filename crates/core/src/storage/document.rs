use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::models::decimal::{fixed4, parse_fixed};
use crate::models::distribution::{Distribution, DistributionCategory};
use crate::models::ledger::Ledger;
use crate::models::position::Classification;
use crate::models::trade::{normalize_ticker, Trade, TradeSide};

/// Canonical serialized form of a [`Ledger`].
///
/// Trades are sorted by date and positions by ticker, and every number is a
/// fixed 4-decimal string, so serializing an unchanged ledger twice yields
/// identical bytes. Derived position values are written for readers of the
/// plaintext form; on load they are recomputed, never trusted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LedgerDocument {
    pub transactions: Vec<TradeRecord>,
    pub assets: Vec<PositionRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub date: NaiveDate,
    pub side: TradeSide,
    pub institution: String,
    pub ticker: String,
    pub quantity: String,
    pub price: String,
    pub amount: String,
    pub fingerprint: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub ticker: String,
    pub classification: Classification,
    pub average_cost: String,
    pub invested_capital: String,
    pub total_income: String,
    pub held_quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_of: Option<String>,
    #[serde(default)]
    pub distributions: Vec<DistributionRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionRecord {
    pub date: NaiveDate,
    pub category: DistributionCategory,
    pub ticker: String,
    pub quantity: String,
    pub unit_value: String,
    pub total_value: String,
    pub fingerprint: String,
}

impl LedgerDocument {
    pub fn from_ledger(ledger: &Ledger) -> Self {
        let mut trades: Vec<&Trade> = ledger.trades().iter().collect();
        trades.sort_by(|a, b| (a.date(), a.fingerprint()).cmp(&(b.date(), b.fingerprint())));

        let transactions = trades
            .into_iter()
            .map(|t| TradeRecord {
                date: t.date(),
                side: t.side(),
                institution: t.institution().to_string(),
                ticker: t.ticker().to_string(),
                quantity: fixed4(t.quantity()),
                price: fixed4(t.price()),
                amount: fixed4(t.amount()),
                fingerprint: t.fingerprint().to_string(),
            })
            .collect();

        let assets = ledger
            .positions()
            .map(|p| {
                let mut distributions: Vec<&Distribution> = p.distributions().iter().collect();
                distributions.sort_by(|a, b| (a.date(), a.fingerprint()).cmp(&(b.date(), b.fingerprint())));
                PositionRecord {
                    ticker: p.ticker().to_string(),
                    classification: p.classification().clone(),
                    average_cost: fixed4(p.average_cost()),
                    invested_capital: fixed4(p.invested_capital()),
                    total_income: fixed4(p.total_income()),
                    held_quantity: p.held_quantity(),
                    subscription_of: p.subscription_of().map(str::to_string),
                    distributions: distributions
                        .into_iter()
                        .map(|d| DistributionRecord {
                            date: d.date(),
                            category: d.category(),
                            ticker: d.ticker().to_string(),
                            quantity: fixed4(d.quantity()),
                            unit_value: fixed4(d.unit_value()),
                            total_value: fixed4(d.total_value()),
                            fingerprint: d.fingerprint().to_string(),
                        })
                        .collect(),
                }
            })
            .collect();

        Self { transactions, assets }
    }

    /// Rebuild a ledger. Records get fresh trade ids and recomputed
    /// fingerprints; derived values are recomputed from the records.
    pub fn into_ledger(self) -> Result<Ledger, CoreError> {
        let mut ledger = Ledger::new();

        for record in self.transactions {
            let trade = Trade::new(
                record.date,
                record.side,
                record.institution,
                record.ticker,
                parse_fixed(&record.quantity, "quantity")?,
                parse_fixed(&record.price, "price")?,
                parse_fixed(&record.amount, "amount")?,
            );
            if trade.fingerprint() != record.fingerprint {
                log::warn!(
                    "Stored fingerprint for {} {} on {} does not match its fields; using recomputed value",
                    trade.side(),
                    trade.ticker(),
                    trade.date()
                );
            }
            if let Err(e) = ledger.insert_trade(trade) {
                if !e.is_duplicate() {
                    return Err(e);
                }
                log::warn!("Skipping duplicate trade in stored ledger: {e}");
            }
        }

        for record in self.assets {
            let ticker = normalize_ticker(&record.ticker);
            let position = ledger.ensure_position(&ticker, record.classification.clone());
            position.set_classification(record.classification);
            position.set_subscription_of(record.subscription_of);

            for d in record.distributions {
                let distribution = Distribution::new(
                    d.date,
                    d.category,
                    d.ticker,
                    parse_fixed(&d.quantity, "quantity")?,
                    parse_fixed(&d.unit_value, "unit value")?,
                    parse_fixed(&d.total_value, "total value")?,
                );
                if distribution.fingerprint() != d.fingerprint {
                    log::warn!(
                        "Stored fingerprint for {} on {} does not match its fields; using recomputed value",
                        distribution.ticker(),
                        distribution.date()
                    );
                }
                if let Err(e) = ledger.insert_distribution(distribution) {
                    if !e.is_duplicate() {
                        return Err(e);
                    }
                    log::warn!("Skipping duplicate distribution in stored ledger: {e}");
                }
            }
        }

        ledger.recompute()?;
        Ok(ledger)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CoreError> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize ledger: {e}")))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        serde_json::from_slice(bytes)
            .map_err(|e| CoreError::Deserialization(format!("Failed to deserialize ledger: {e}")))
    }
}
