//! The trading core: matching, pricing, positions, ledger, resolution.
//!
//! Ownership is strict: the ledger is the only writer of balances and
//! transaction rows, the position book of holdings, the pricing engine of
//! probabilities. The matching and resolution engines orchestrate and never
//! bypass the owners.

pub mod ledger;
pub mod matching;
pub mod position;
pub mod pricing;
pub mod resolution;

pub use matching::{
    ExecuteTradeRequest, ExecuteTradeResult, PlaceOrderRequest, PlaceOrderResult,
};
pub use resolution::ResolveMarketResult;
