//! Content fingerprints for ledger records.
//!
//! A fingerprint is the hex SHA-256 of a record's defining fields joined with
//! `|`. Decimals are rendered with a fixed 8-place scale so that `2.8` and
//! `2.80` hash identically. Two records are duplicates iff their fingerprints
//! match.

use sha2::{Digest, Sha256};

use crate::models::decimal::fixed;
use crate::models::distribution::Distribution;
use crate::models::trade::Trade;

/// Decimal places used when rendering numbers into the hashed payload.
const FINGERPRINT_SCALE: u32 = 8;

/// Fingerprint over (date, side, institution, ticker, quantity, price, amount).
pub fn of_trade(trade: &Trade) -> String {
    digest(&[
        trade.date().format("%Y-%m-%d").to_string(),
        trade.side().as_str().to_string(),
        trade.institution().to_string(),
        trade.ticker().to_string(),
        fixed(trade.quantity(), FINGERPRINT_SCALE),
        fixed(trade.price(), FINGERPRINT_SCALE),
        fixed(trade.amount(), FINGERPRINT_SCALE),
    ])
}

/// Fingerprint over (date, category, ticker, quantity, unit value, total value).
pub fn of_distribution(distribution: &Distribution) -> String {
    digest(&[
        distribution.date().format("%Y-%m-%d").to_string(),
        distribution.category().as_str().to_string(),
        distribution.ticker().to_string(),
        fixed(distribution.quantity(), FINGERPRINT_SCALE),
        fixed(distribution.unit_value(), FINGERPRINT_SCALE),
        fixed(distribution.total_value(), FINGERPRINT_SCALE),
    ])
}

fn digest(fields: &[String]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(fields.join("|").as_bytes());
    hex::encode(hasher.finalize())
}
