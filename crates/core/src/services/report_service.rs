use chrono::Datelike;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::models::decimal::round4;
use crate::models::distribution::DistributionCategory;
use crate::models::ledger::Ledger;
use crate::models::position::Position;

/// Grouping key for classification views.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassificationGroup {
    pub kind: String,
    pub segment: Option<String>,
}

/// Read-only views over the ledger: what is held, what was sold, and how
/// much income came in.
pub struct ReportService;

impl ReportService {
    pub fn new() -> Self {
        Self
    }

    /// Positions still held (non-zero quantity), ordered by ticker.
    pub fn active_positions<'a>(&self, ledger: &'a Ledger) -> Vec<&'a Position> {
        ledger.positions().filter(|p| p.is_active()).collect()
    }

    /// Positions sold down to zero. History is kept; they are just not held.
    pub fn closed_positions<'a>(&self, ledger: &'a Ledger) -> Vec<&'a Position> {
        ledger.positions().filter(|p| !p.is_active()).collect()
    }

    /// Group positions by (kind, segment).
    pub fn group_by_classification<'a>(
        &self,
        ledger: &'a Ledger,
        active_only: bool,
    ) -> BTreeMap<ClassificationGroup, Vec<&'a Position>> {
        let mut groups: BTreeMap<ClassificationGroup, Vec<&Position>> = BTreeMap::new();
        for position in ledger.positions() {
            if active_only && !position.is_active() {
                continue;
            }
            let key = ClassificationGroup {
                kind: position.classification().kind.clone(),
                segment: position.classification().segment.clone(),
            };
            groups.entry(key).or_default().push(position);
        }
        groups
    }

    /// Total distribution income per category, across all positions.
    pub fn income_by_category(&self, ledger: &Ledger) -> BTreeMap<DistributionCategory, Decimal> {
        let mut totals: BTreeMap<DistributionCategory, Decimal> = BTreeMap::new();
        for d in ledger.positions().flat_map(|p| p.distributions()) {
            let total = totals.entry(d.category()).or_insert(Decimal::ZERO);
            *total = total.saturating_add(d.total_value());
        }
        totals.into_iter().map(|(k, v)| (k, round4(v))).collect()
    }

    /// Total distribution income per calendar year of payment.
    pub fn income_by_year(&self, ledger: &Ledger) -> BTreeMap<i32, Decimal> {
        let mut totals: BTreeMap<i32, Decimal> = BTreeMap::new();
        for d in ledger.positions().flat_map(|p| p.distributions()) {
            let total = totals.entry(d.date().year()).or_insert(Decimal::ZERO);
            *total = total.saturating_add(d.total_value());
        }
        totals.into_iter().map(|(k, v)| (k, round4(v))).collect()
    }
}

impl Default for ReportService {
    fn default() -> Self {
        Self::new()
    }
}
