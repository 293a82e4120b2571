use rust_decimal::Decimal;

/// Counts reported by a batch import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchOutcome {
    pub added: usize,
    pub duplicates: usize,
}

/// Outcome of folding a fractional-market ticker into its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeResult {
    pub source_ticker: String,
    pub target_ticker: String,
    pub trades_moved: usize,
    pub distributions_moved: usize,

    /// Whether the target position had to be created for this merge
    pub target_created: bool,

    pub target_quantity_before: i64,
    pub target_quantity_after: i64,
}

/// Outcome of converting subscription rights into the parent instrument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    pub subscription_ticker: String,
    pub parent_ticker: String,
    pub purchases_converted: usize,

    /// Sales of the rights themselves, which are dropped
    pub sales_discarded: usize,

    pub distributions_moved: usize,
    pub parent_quantity_before: i64,
    pub parent_quantity_after: i64,
    pub parent_average_cost_before: Decimal,
    pub parent_average_cost_after: Decimal,
}
