pub mod corporate_action;
pub mod decimal;
pub mod distribution;
pub mod ledger;
pub mod outcome;
pub mod position;
pub mod trade;
