pub mod holding;
pub mod market;
pub mod order;
pub mod trade;
pub mod transaction;
pub mod user;

pub use holding::Holding;
pub use market::{Market, Outcome};
pub use order::Order;
pub use trade::Trade;
pub use transaction::Transaction;
pub use user::User;

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "BUY" => Some(Side::Buy),
            "SELL" => Some(Side::Sell),
            _ => None,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

// ---------------------------------------------------------------------------
// OrderKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderKind {
    Limit,
    Market,
}

impl OrderKind {
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "LIMIT" => Some(OrderKind::Limit),
            "MARKET" => Some(OrderKind::Market),
            _ => None,
        }
    }
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderKind::Limit => write!(f, "LIMIT"),
            OrderKind::Market => write!(f, "MARKET"),
        }
    }
}

// ---------------------------------------------------------------------------
// Status and ledger tag constants (stored as TEXT)
// ---------------------------------------------------------------------------

pub mod order_status {
    pub const OPEN: &str = "OPEN";
    pub const FILLED: &str = "FILLED";
    pub const CANCELLED: &str = "CANCELLED";
}

pub mod txn_kind {
    pub const REGISTRATION_BONUS: &str = "REGISTRATION_BONUS";
    pub const ORDER_RESERVE: &str = "ORDER_RESERVE";
    pub const ORDER_CANCEL_REFUND: &str = "ORDER_CANCEL_REFUND";
    pub const ORDER_REFUND: &str = "ORDER_REFUND";
    pub const TRADE_BUY: &str = "TRADE_BUY";
    pub const TRADE_SELL: &str = "TRADE_SELL";
    pub const MARKET_RESOLUTION_PAYOUT: &str = "MARKET_RESOLUTION_PAYOUT";
}
