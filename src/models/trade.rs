use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Immutable execution record. Order-book matches write one row per
/// counterparty side; direct (AMM-style) executions write a single row.
/// `amount` is in shares, `notional` in currency.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Trade {
    pub id: Uuid,
    pub user_id: Uuid,
    pub counterparty_order_id: Option<Uuid>,
    pub market_id: Uuid,
    pub outcome_id: Uuid,
    pub side: String,
    pub amount: Decimal,
    pub price: Decimal,
    pub notional: Decimal,
    pub executed_at: DateTime<Utc>,
}
