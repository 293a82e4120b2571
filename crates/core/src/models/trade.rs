use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::CoreError;
use crate::fingerprint;

use super::decimal::{out_of_range, round4};

/// Stable internal identity of a trade.
///
/// Assigned once at construction and carried through corporate-action
/// adjustments and re-tickering, unlike the content fingerprint which changes
/// whenever the trade's fields do.
pub type TradeId = Uuid;

/// Direction of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TradeSide {
    /// Purchase: increases the position and its cost basis
    Buy,
    /// Sale: decreases the position only
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "Buy",
            TradeSide::Sell => "Sell",
        }
    }
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TradeSide {
    type Err = CoreError;

    /// Accepts English labels and the broker export labels (`Compra`/`Venda`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buy" | "compra" => Ok(TradeSide::Buy),
            "sell" | "venda" => Ok(TradeSide::Sell),
            other => Err(CoreError::Validation(format!(
                "Trade side must be 'Buy' or 'Sell' (received '{other}')"
            ))),
        }
    }
}

/// A single buy/sell record from a broker statement.
///
/// Records are immutable: every field that feeds the fingerprint is private,
/// and adjustments produce a new `Trade` with the same [`TradeId`] and a
/// freshly computed fingerprint. Quantities and money are kept at 4 decimal
/// places so the persisted fixed-point form round-trips exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    id: TradeId,
    date: NaiveDate,
    side: TradeSide,
    institution: String,
    ticker: String,
    quantity: Decimal,
    price: Decimal,
    amount: Decimal,
    fingerprint: String,
}

impl Trade {
    pub fn new(
        date: NaiveDate,
        side: TradeSide,
        institution: impl Into<String>,
        ticker: impl Into<String>,
        quantity: Decimal,
        price: Decimal,
        amount: Decimal,
    ) -> Self {
        Self::build(
            Uuid::new_v4(),
            date,
            side,
            institution.into().trim().to_string(),
            normalize_ticker(&ticker.into()),
            quantity,
            price,
            amount,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        id: TradeId,
        date: NaiveDate,
        side: TradeSide,
        institution: String,
        ticker: String,
        quantity: Decimal,
        price: Decimal,
        amount: Decimal,
    ) -> Self {
        let mut trade = Self {
            id,
            date,
            side,
            institution,
            ticker,
            quantity: round4(quantity),
            price: round4(price),
            amount: round4(amount),
            fingerprint: String::new(),
        };
        trade.fingerprint = fingerprint::of_trade(&trade);
        trade
    }

    /// New record with adjusted quantity and price. The amount is recomputed
    /// from the two rather than carried over.
    pub(crate) fn adjusted(&self, quantity: Decimal, price: Decimal) -> Result<Self, CoreError> {
        let quantity = round4(quantity);
        let price = round4(price);
        let amount = quantity
            .checked_mul(price)
            .ok_or_else(|| out_of_range(&self.ticker))?;
        Ok(Self::build(
            self.id,
            self.date,
            self.side,
            self.institution.clone(),
            self.ticker.clone(),
            quantity,
            price,
            amount,
        ))
    }

    /// New record booked under a different ticker.
    pub(crate) fn reticker(&self, ticker: &str) -> Self {
        Self::build(
            self.id,
            self.date,
            self.side,
            self.institution.clone(),
            normalize_ticker(ticker),
            self.quantity,
            self.price,
            self.amount,
        )
    }

    pub fn id(&self) -> TradeId {
        self.id
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn side(&self) -> TradeSide {
        self.side
    }

    pub fn is_buy(&self) -> bool {
        self.side == TradeSide::Buy
    }

    pub fn institution(&self) -> &str {
        &self.institution
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

/// Canonical ticker form: trimmed and upper-cased.
pub fn normalize_ticker(ticker: &str) -> String {
    ticker.trim().to_uppercase()
}
