use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row for the orders table.
///
/// Denomination: BUY orders are denominated in notional currency (`amount`
/// is currency to spend, `filled` currency consumed); SELL orders are
/// denominated in shares (`amount` shares offered, `filled` shares sold).
/// `filled` only ever increases and `status` moves one-way from OPEN to
/// FILLED or CANCELLED.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub market_id: Uuid,
    pub outcome_id: Uuid,
    pub side: String,
    pub kind: String,
    pub amount: Decimal,
    pub price: Decimal,
    pub filled: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn remaining(&self) -> Decimal {
        self.amount - self.filled
    }
}
